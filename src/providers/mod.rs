pub mod nbp;
