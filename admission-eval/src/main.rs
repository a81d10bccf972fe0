//! Evaluate Kubernetes admission policies and webhook match conditions offline.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use admission_eval_lib::{Host, run};
use std::io::Write;
use std::io::{stderr, stdout};

/// Default host backed by the process's standard streams.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
fn main() -> Result<(), ohno::AppError> {
    run(&mut RealHost, std::env::args())
}
