pub mod audit;
pub mod enrichment;
pub mod ingress;
