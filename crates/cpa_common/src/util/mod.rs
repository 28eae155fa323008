pub mod id_gen;
pub mod intern;
pub mod tvl;
