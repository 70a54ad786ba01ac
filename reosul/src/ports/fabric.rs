//! Shared rendezvous state of all ports of one connector instance.
//!
//! A consumer that wants to read opens a *ticket* on one or several ports: a
//! select ticket is satisfied by a single value arriving on any of its ports,
//! a join ticket needs one value on each of its ports. A producer that wants
//! to write raises *demand* on its port, waits until the ticket on that port
//! can be claimed, claims it and finally delivers its value (or releases the
//! claim).
//!
//! A claimed select ticket never times out: its owner keeps waiting until the
//! claimer delivers or releases. This is what makes transfers over several
//! ports atomic, since a producer may claim the tickets of all its sinks at
//! once before reading its own source. Delivering into a join ticket is
//! two-phase: the value is staged, the join commits once every port is staged
//! within one delay window and aborts otherwise, and the producer only
//! completes its other transfers if the join committed.
//!
//! All ports of an instance share a single lock and condition variable.
//! Multi-port decisions are therefore taken on a consistent snapshot, and
//! every state change simply wakes all waiters of the instance.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use slab::Slab;

use crate::util::rng::Rng;

/// Index of a port within its fabric.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PortId(pub(crate) usize);

/// Rendezvous state of all ports of a connector instance.
pub(crate) struct Fabric {
    /// Port names, indexed by `PortId`.
    names: Box<[String]>,
    /// Bound of every rendezvous attempt made by channel processes.
    delay: Duration,
    state: Mutex<State>,
    signal: Condvar,
}

struct State {
    ports: Vec<PortState>,
    tickets: Slab<Ticket>,
    rng: Rng,
    is_stopped: bool,
}

#[derive(Default)]
struct PortState {
    /// The ticket currently opened by the consumer of this port.
    ticket: Option<usize>,
    /// Whether the producer of this port is waiting to claim it.
    demand: bool,
}

enum Ticket {
    Select(Select),
    Join(Join),
}

struct Select {
    ports: Vec<PortId>,
    state: SelectState,
}

enum SelectState {
    /// The ticket can be claimed through any of its ports, except that a
    /// preferred port, while it has demand, has exclusive access.
    Open { preferred: Option<PortId> },
    Claimed,
    Filled { port: PortId, value: String },
}

struct Join {
    ports: Vec<PortId>,
    slots: Vec<JoinSlot>,
    /// Window within which all slots must be staged once one of them is.
    window: Duration,
    deadline: Option<Instant>,
    verdict: Option<bool>,
    /// Producers that staged a value and have not yet collected the verdict.
    pending_votes: usize,
}

enum JoinSlot {
    Open,
    Claimed,
    Staged(String),
}

/// Outcome of a read on a select ticket.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    Value { port: PortId, value: String },
    Timeout,
    Stopped,
}

/// Outcome of a read on a join ticket.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum JoinOutcome {
    /// One value per port, in port order.
    Values(Vec<String>),
    Timeout,
    Stopped,
}

/// Outcome of an attempt to claim the tickets of a set of ports.
#[derive(Debug)]
pub(crate) enum ClaimOutcome {
    Claimed(Claims),
    Timeout,
    /// The upstream demand that motivated the claim has vanished.
    Withdrawn,
    Stopped,
}

/// Outcome of a delivery.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    Delivered,
    /// A join ticket aborted; none of the claimed consumers got the value.
    Refused,
    Stopped,
}

#[derive(Debug)]
struct Claim {
    port: PortId,
    ticket: usize,
    is_joint: bool,
}

/// Tickets claimed by a producer.
///
/// Claims must be either delivered or released, otherwise the claimed
/// consumers would wait until the instance is stopped.
#[derive(Debug)]
#[must_use]
pub(crate) struct Claims(Vec<Claim>);

impl Fabric {
    /// Creates the fabric of a connector instance with the specified port
    /// names.
    pub(crate) fn new(names: Vec<String>, delay: Duration) -> Self {
        let ports = names.iter().map(|_| PortState::default()).collect();

        Self {
            names: names.into_boxed_slice(),
            delay,
            state: Mutex::new(State {
                ports,
                tickets: Slab::new(),
                rng: Rng::from_entropy(),
                is_stopped: false,
            }),
            signal: Condvar::new(),
        }
    }

    /// Returns the name of a port.
    pub(crate) fn name(&self, port: PortId) -> &str {
        &self.names[port.0]
    }

    /// Returns the bound of a rendezvous attempt.
    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the deadline of a rendezvous attempt starting now.
    pub(crate) fn deadline(&self) -> Instant {
        Instant::now() + self.delay
    }

    /// Broadcasts the stop request to all waiters.
    pub(crate) fn request_stop(&self) {
        self.state.lock().is_stopped = true;
        self.signal.notify_all();
    }

    /// Checks whether the stop request was broadcast.
    pub(crate) fn is_stopped(&self) -> bool {
        self.state.lock().is_stopped
    }

    /// Blocks until a producer has demand on at least one of the specified
    /// ports.
    ///
    /// Returns `false` if the instance was stopped.
    pub(crate) fn await_demand(&self, ports: &[PortId]) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.is_stopped {
                return false;
            }
            if ports.iter().any(|port| state.ports[port.0].demand) {
                return true;
            }
            self.signal.wait(&mut state);
        }
    }

    /// Reads one value from any of the specified ports.
    ///
    /// If several producers are already waiting when the ticket is opened,
    /// one of them is picked at random to get the first chance. Without
    /// deadline, the read only returns once a value arrives or the instance
    /// is stopped.
    pub(crate) fn read(&self, ports: &[PortId], deadline: Option<Instant>) -> ReadOutcome {
        let mut state = self.state.lock();

        // Another read may still be pending if the environment issues
        // overlapping reads on the same port.
        while ports.iter().any(|port| state.ports[port.0].ticket.is_some()) {
            if state.is_stopped {
                return ReadOutcome::Stopped;
            }
            if !self.wait(&mut state, deadline) {
                return ReadOutcome::Timeout;
            }
        }
        if state.is_stopped {
            return ReadOutcome::Stopped;
        }

        let preferred = state.pick_preferred(ports);
        let key = state.tickets.insert(Ticket::Select(Select {
            ports: ports.to_vec(),
            state: SelectState::Open { preferred },
        }));
        for port in ports {
            state.ports[port.0].ticket = Some(key);
        }
        self.signal.notify_all();

        loop {
            if state.is_stopped {
                state.close_ticket(key);
                return ReadOutcome::Stopped;
            }
            let Ticket::Select(select) = &mut state.tickets[key] else {
                unreachable!("a select ticket was turned into a join ticket");
            };
            if let SelectState::Filled { port, value } = &mut select.state {
                let outcome = ReadOutcome::Value {
                    port: *port,
                    value: std::mem::take(value),
                };
                state.close_ticket(key);
                self.signal.notify_all();

                return outcome;
            }

            if matches!(select.state, SelectState::Claimed) {
                self.signal.wait(&mut state);
            } else if !self.wait(&mut state, deadline) && state.is_open_select(key) {
                state.close_ticket(key);
                self.signal.notify_all();

                return ReadOutcome::Timeout;
            }
        }
    }

    /// Reads one value from each of the specified ports, jointly.
    ///
    /// The ticket stays open until a first value is staged; from then on all
    /// other ports must be staged within `window`, otherwise every staged
    /// value is refused.
    pub(crate) fn read_joint(&self, ports: &[PortId], window: Duration) -> JoinOutcome {
        let mut state = self.state.lock();
        if state.is_stopped {
            return JoinOutcome::Stopped;
        }

        let key = state.tickets.insert(Ticket::Join(Join {
            ports: ports.to_vec(),
            slots: ports.iter().map(|_| JoinSlot::Open).collect(),
            window,
            deadline: None,
            verdict: None,
            pending_votes: 0,
        }));
        for port in ports {
            state.ports[port.0].ticket = Some(key);
        }
        self.signal.notify_all();

        loop {
            let is_stopped = state.is_stopped;
            let Ticket::Join(join) = &mut state.tickets[key] else {
                unreachable!("a join ticket was turned into a select ticket");
            };

            let outcome = if is_stopped {
                Some(JoinOutcome::Stopped)
            } else if join
                .slots
                .iter()
                .all(|slot| matches!(slot, JoinSlot::Staged(_)))
            {
                let values = join
                    .slots
                    .iter_mut()
                    .map(|slot| match std::mem::replace(slot, JoinSlot::Open) {
                        JoinSlot::Staged(value) => value,
                        _ => unreachable!(),
                    })
                    .collect();

                Some(JoinOutcome::Values(values))
            } else {
                let is_claimed = join
                    .slots
                    .iter()
                    .any(|slot| matches!(slot, JoinSlot::Claimed));
                let is_expired = join.deadline.is_some_and(|t| Instant::now() >= t);

                (is_expired && !is_claimed).then_some(JoinOutcome::Timeout)
            };

            match outcome {
                Some(outcome) => {
                    join.verdict = Some(matches!(outcome, JoinOutcome::Values(_)));
                    let is_settled = join.pending_votes == 0;
                    state.detach_ticket(key);
                    if is_settled {
                        state.tickets.remove(key);
                    }
                    self.signal.notify_all();

                    return outcome;
                }
                None => {
                    // While a slot is claimed, the claimer bounds the wait.
                    let deadline = join.deadline.filter(|_| {
                        !join
                            .slots
                            .iter()
                            .any(|slot| matches!(slot, JoinSlot::Claimed))
                    });
                    self.wait(&mut state, deadline);
                }
            }
        }
    }

    /// Claims the tickets of all specified ports at once.
    ///
    /// Demand is raised on the ports for the duration of the attempt. If
    /// `upstream` is not empty, the attempt is withdrawn as soon as none of
    /// the upstream ports has demand any more.
    pub(crate) fn claim(
        &self,
        ports: &[PortId],
        deadline: Instant,
        upstream: &[PortId],
    ) -> ClaimOutcome {
        let mut state = self.state.lock();
        state.set_demand(ports, true);
        self.signal.notify_all();

        let outcome = loop {
            if state.is_stopped {
                break ClaimOutcome::Stopped;
            }
            if !upstream.is_empty() && !upstream.iter().any(|port| state.ports[port.0].demand) {
                break ClaimOutcome::Withdrawn;
            }
            if let Some(claims) = state.try_claim(ports) {
                break ClaimOutcome::Claimed(claims);
            }
            if !self.wait(&mut state, Some(deadline)) {
                break ClaimOutcome::Timeout;
            }
        };

        state.set_demand(ports, false);
        self.signal.notify_all();

        outcome
    }

    /// Delivers a value to all claimed consumers, or to none of them.
    pub(crate) fn deliver(&self, claims: Claims, value: String) -> Delivery {
        let Claims(claims) = claims;
        let mut state = self.state.lock();
        // Tickets may have been discarded by their owner after the stop.
        if state.is_stopped {
            return Delivery::Stopped;
        }

        // Stage the value in all joint tickets.
        for claim in claims.iter().filter(|claim| claim.is_joint) {
            let join = state.join_mut(claim.ticket);
            if join.slots.iter().all(|slot| !matches!(slot, JoinSlot::Staged(_))) {
                join.deadline = Some(Instant::now() + join.window);
            }
            *join.slot_mut(claim.port) = JoinSlot::Staged(value.clone());
            join.pending_votes += 1;
        }
        self.signal.notify_all();

        // Collect the verdicts.
        let mut is_accepted = true;
        for claim in claims.iter().filter(|claim| claim.is_joint) {
            let verdict = loop {
                if state.is_stopped {
                    return Delivery::Stopped;
                }
                if let Some(verdict) = state.join_mut(claim.ticket).verdict {
                    break verdict;
                }
                self.signal.wait(&mut state);
            };
            let join = state.join_mut(claim.ticket);
            join.pending_votes -= 1;
            if join.pending_votes == 0 {
                state.tickets.remove(claim.ticket);
            }
            is_accepted &= verdict;
        }

        for claim in claims.iter().filter(|claim| !claim.is_joint) {
            let select = state.select_mut(claim.ticket);
            select.state = if is_accepted {
                SelectState::Filled {
                    port: claim.port,
                    value: value.clone(),
                }
            } else {
                SelectState::Open { preferred: None }
            };
        }
        self.signal.notify_all();

        if is_accepted {
            Delivery::Delivered
        } else {
            Delivery::Refused
        }
    }

    /// Gives up claimed tickets without delivering anything.
    pub(crate) fn release(&self, claims: Claims) {
        let Claims(claims) = claims;
        let mut state = self.state.lock();
        if state.is_stopped {
            return;
        }
        for claim in &claims {
            if claim.is_joint {
                let slot = state.join_mut(claim.ticket).slot_mut(claim.port);
                if matches!(slot, JoinSlot::Claimed) {
                    *slot = JoinSlot::Open;
                }
            } else {
                state.select_mut(claim.ticket).state = SelectState::Open { preferred: None };
            }
        }
        self.signal.notify_all();
    }

    /// Waits for a notification or until the deadline, if any.
    ///
    /// Returns `false` if the deadline has elapsed.
    fn wait(&self, state: &mut MutexGuard<'_, State>, deadline: Option<Instant>) -> bool {
        match deadline {
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return false;
                }
                self.signal.wait_until(state, deadline);

                Instant::now() < deadline
            }
            None => {
                self.signal.wait(state);

                true
            }
        }
    }
}

impl State {
    fn set_demand(&mut self, ports: &[PortId], demand: bool) {
        for port in ports {
            self.ports[port.0].demand = demand;
        }
    }

    /// Picks one of the ports that currently have demand, if there are
    /// several of them.
    fn pick_preferred(&self, ports: &[PortId]) -> Option<PortId> {
        let demanded: Vec<PortId> = ports
            .iter()
            .copied()
            .filter(|port| self.ports[port.0].demand)
            .collect();

        (demanded.len() > 1).then(|| demanded[self.rng.gen_index(demanded.len())])
    }

    /// Returns the key of the ticket of `port` if a producer could claim it
    /// right now.
    fn claimable(&self, port: PortId) -> Option<usize> {
        let key = self.ports[port.0].ticket?;
        let is_claimable = match &self.tickets[key] {
            Ticket::Select(select) => match select.state {
                SelectState::Open { preferred } => preferred.map_or(true, |preferred| {
                    preferred == port || !self.ports[preferred.0].demand
                }),
                _ => false,
            },
            Ticket::Join(join) => {
                join.verdict.is_none() && matches!(join.slot(port), JoinSlot::Open)
            }
        };

        is_claimable.then_some(key)
    }

    /// Claims the tickets of all ports if they can all be claimed at once.
    fn try_claim(&mut self, ports: &[PortId]) -> Option<Claims> {
        let mut claims = Vec::with_capacity(ports.len());
        for &port in ports {
            let ticket = self.claimable(port)?;
            let is_joint = matches!(self.tickets[ticket], Ticket::Join(_));
            // A select ticket can only be claimed once.
            if !is_joint && claims.iter().any(|claim: &Claim| claim.ticket == ticket) {
                return None;
            }
            claims.push(Claim {
                port,
                ticket,
                is_joint,
            });
        }

        for claim in &claims {
            match &mut self.tickets[claim.ticket] {
                Ticket::Select(select) => select.state = SelectState::Claimed,
                Ticket::Join(join) => *join.slot_mut(claim.port) = JoinSlot::Claimed,
            }
        }

        Some(Claims(claims))
    }

    fn is_open_select(&self, key: usize) -> bool {
        matches!(
            &self.tickets[key],
            Ticket::Select(Select {
                state: SelectState::Open { .. },
                ..
            })
        )
    }

    /// Unregisters a ticket from its ports so it can no longer be claimed.
    fn detach_ticket(&mut self, key: usize) {
        let ports = match &self.tickets[key] {
            Ticket::Select(select) => &select.ports,
            Ticket::Join(join) => &join.ports,
        };
        for port in ports {
            let port_state = &mut self.ports[port.0];
            if port_state.ticket == Some(key) {
                port_state.ticket = None;
            }
        }
    }

    /// Unregisters and removes a ticket.
    fn close_ticket(&mut self, key: usize) {
        self.detach_ticket(key);
        self.tickets.remove(key);
    }

    fn select_mut(&mut self, key: usize) -> &mut Select {
        match &mut self.tickets[key] {
            Ticket::Select(select) => select,
            Ticket::Join(_) => unreachable!("claimed ticket is not a select ticket"),
        }
    }

    fn join_mut(&mut self, key: usize) -> &mut Join {
        match &mut self.tickets[key] {
            Ticket::Join(join) => join,
            Ticket::Select(_) => unreachable!("claimed ticket is not a join ticket"),
        }
    }
}

impl Join {
    fn position(&self, port: PortId) -> usize {
        self.ports
            .iter()
            .position(|&p| p == port)
            .unwrap_or_else(|| unreachable!("port is not part of the join ticket"))
    }

    fn slot(&self, port: PortId) -> &JoinSlot {
        &self.slots[self.position(port)]
    }

    fn slot_mut(&mut self, port: PortId) -> &mut JoinSlot {
        let position = self.position(port);

        &mut self.slots[position]
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const DELAY: Duration = Duration::from_millis(50);

    fn fabric(ports: usize) -> Fabric {
        Fabric::new(
            (0..ports).map(|i| format!("P{i}")).collect(),
            DELAY,
        )
    }

    fn write(fabric: &Fabric, port: PortId, value: &str) -> Delivery {
        match fabric.claim(&[port], fabric.deadline(), &[]) {
            ClaimOutcome::Claimed(claims) => fabric.deliver(claims, value.into()),
            _ => Delivery::Refused,
        }
    }

    #[test]
    fn fabric_rendezvous() {
        let fabric = fabric(1);
        let port = PortId(0);

        thread::scope(|s| {
            let writer = s.spawn(|| write(&fabric, port, "x"));
            let read = fabric.read(&[port], Some(fabric.deadline()));

            assert_eq!(
                read,
                ReadOutcome::Value {
                    port,
                    value: "x".into()
                }
            );
            assert_eq!(writer.join().unwrap(), Delivery::Delivered);
        });
    }

    #[test]
    fn fabric_read_timeout() {
        let fabric = fabric(1);

        let start = Instant::now();
        assert_eq!(
            fabric.read(&[PortId(0)], Some(fabric.deadline())),
            ReadOutcome::Timeout
        );
        assert!(start.elapsed() >= DELAY);
    }

    #[test]
    fn fabric_claim_timeout() {
        let fabric = fabric(1);

        assert!(matches!(
            fabric.claim(&[PortId(0)], fabric.deadline(), &[]),
            ClaimOutcome::Timeout
        ));
        // Demand is cleared after the attempt.
        assert!(!fabric.state.lock().ports[0].demand);
    }

    #[test]
    fn fabric_claim_withdrawn() {
        let fabric = fabric(2);

        thread::scope(|s| {
            s.spawn(|| fabric.read(&[PortId(1)], Some(fabric.deadline())));
            // No demand on the upstream port.
            assert!(matches!(
                fabric.claim(&[PortId(1)], fabric.deadline(), &[PortId(0)]),
                ClaimOutcome::Withdrawn
            ));
        });
    }

    #[test]
    fn fabric_released_claim_reopens_ticket() {
        let fabric = fabric(1);
        let port = PortId(0);

        thread::scope(|s| {
            let reader = s.spawn(|| fabric.read(&[port], Some(fabric.deadline())));

            let ClaimOutcome::Claimed(claims) = fabric.claim(&[port], fabric.deadline(), &[])
            else {
                panic!("the reader ticket could not be claimed");
            };
            // A claimed ticket outlives the reader deadline.
            thread::sleep(DELAY * 2);
            fabric.release(claims);

            assert_eq!(reader.join().unwrap(), ReadOutcome::Timeout);
        });
    }

    #[test]
    fn fabric_joint_read() {
        let fabric = fabric(2);

        thread::scope(|s| {
            let drain = s.spawn(|| fabric.read_joint(&[PortId(0), PortId(1)], DELAY));
            let left = s.spawn(|| write(&fabric, PortId(0), "l"));
            let right = s.spawn(|| write(&fabric, PortId(1), "r"));

            assert_eq!(left.join().unwrap(), Delivery::Delivered);
            assert_eq!(right.join().unwrap(), Delivery::Delivered);
            assert_eq!(
                drain.join().unwrap(),
                JoinOutcome::Values(vec!["l".into(), "r".into()])
            );
        });
        assert!(fabric.state.lock().tickets.is_empty());
    }

    #[test]
    fn fabric_lone_joint_value_refused() {
        let fabric = fabric(2);

        thread::scope(|s| {
            let drain = s.spawn(|| fabric.read_joint(&[PortId(0), PortId(1)], DELAY));

            assert_eq!(write(&fabric, PortId(0), "l"), Delivery::Refused);
            assert_eq!(drain.join().unwrap(), JoinOutcome::Timeout);
        });
        assert!(fabric.state.lock().tickets.is_empty());
    }

    #[test]
    fn fabric_stop_wakes_waiters() {
        let fabric = fabric(2);

        thread::scope(|s| {
            let reader = s.spawn(|| fabric.read(&[PortId(0)], None));
            let idle = s.spawn(|| fabric.await_demand(&[PortId(1)]));

            thread::sleep(DELAY);
            fabric.request_stop();

            assert_eq!(reader.join().unwrap(), ReadOutcome::Stopped);
            assert!(!idle.join().unwrap());
        });
        assert!(fabric.is_stopped());
        assert_eq!(
            fabric.read(&[PortId(0)], Some(fabric.deadline())),
            ReadOutcome::Stopped
        );
    }
}
