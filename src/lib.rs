//! school-ledger - budget allocation and usage ledger for school districts
//!
//! A district allocates a budget to a school for a fiscal year and
//! category; the school records expenditures against it. The ledger
//! guarantees that cumulative usage never exceeds the allocation, derives
//! the lifecycle status from the running balance, and aggregates statistics
//! per scope, all safely under concurrent writes.

pub mod cli;
pub mod config;
pub mod http;
pub mod ledger;
pub mod observability;
pub mod scope;
