use std::collections::HashMap;
use std::sync::Mutex;

use crate::app::exec::ExecSession;

pub struct AppState {
    pub exec_sessions: Mutex<HashMap<String, ExecSession>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            exec_sessions: Mutex::new(HashMap::new()),
        }
    }
}
