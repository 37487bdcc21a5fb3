mod fixtures;

mod audit_tests;
mod enrichment_tests;
mod ingestion_tests;
mod privacy_tests;
mod retention_tests;
