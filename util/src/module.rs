//! Module interfaces
//!
//! Every cyclically processed module of the executable implements [`State`],
//! so the main loop can initialise it from the session and drive it once per
//! cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use std::fmt::Display;

use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A cyclically processed module.
pub trait State {
    /// Name used when logging on behalf of the module.
    const NAME: &'static str;

    type InitData;
    type InitError;

    type InputData;
    type OutputData;
    type StatusReport;

    /// Non-fatal processing error, the module remains usable afterwards.
    type ProcError: Display;

    /// Initialise the module, usually from a parameter file, creating any
    /// archives inside the session.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Process one cycle's worth of input.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;

    /// Process one cycle, logging a processing error rather than returning
    /// it.
    fn proc_logged(&mut self, input_data: &Self::InputData)
        -> Option<(Self::OutputData, Self::StatusReport)>
    {
        match self.proc(input_data) {
            Ok(o) => Some(o),
            Err(e) => {
                warn!("Error during {} processing: {}", Self::NAME, e);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Sums its inputs, refusing negative ones.
    #[derive(Default)]
    struct Summer {
        total: i32
    }

    impl State for Summer {
        const NAME: &'static str = "Summer";

        type InitData = i32;
        type InitError = ();

        type InputData = i32;
        type OutputData = i32;
        type StatusReport = ();
        type ProcError = String;

        fn init(&mut self, init_data: i32, _session: &Session) -> Result<(), ()> {
            self.total = init_data;
            Ok(())
        }

        fn proc(&mut self, input_data: &i32) -> Result<(i32, ()), String> {
            if *input_data < 0 {
                return Err(format!("negative input {}", input_data));
            }

            self.total += input_data;
            Ok((self.total, ()))
        }
    }

    #[test]
    fn test_proc_logged() {
        let mut s = Summer::default();

        assert_eq!(s.proc_logged(&2), Some((2, ())));
        assert_eq!(s.proc_logged(&-1), None);
        assert_eq!(s.proc_logged(&3), Some((5, ())));
    }
}
