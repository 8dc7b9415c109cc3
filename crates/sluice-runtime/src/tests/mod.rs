//! Test suites for component activation.

mod support;
