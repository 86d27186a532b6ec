//! The DOCTOR script bundled with the crate.

use crate::error::ScriptError;
use crate::script::load_script;
use crate::types::Script;

/// Source text of Weizenbaum's DOCTOR script
pub const DOCTOR_SCRIPT: &str = include_str!("../scripts/doctor.txt");

/// Parses the bundled DOCTOR script.
pub fn load_doctor_script() -> Result<Script, ScriptError> {
    load_script(DOCTOR_SCRIPT)
}
