//! Unit tests for the exchange bounded context.
