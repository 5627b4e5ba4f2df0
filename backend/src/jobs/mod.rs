pub mod backfill;
pub mod purge;
