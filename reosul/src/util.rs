pub(crate) mod rng;
