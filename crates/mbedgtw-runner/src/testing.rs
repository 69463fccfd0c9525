//! Scripted [`CommandRunner`] for unit tests

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::ProcessError;
use crate::process::{CommandRunner, Invocation, ProcessOutput};

type Action = Box<dyn Fn(&Invocation)>;

struct Response {
    output: ProcessOutput,
    action: Option<Action>,
}

/// Replays queued responses in order and records every invocation
#[derive(Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<Response>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next invocation
    pub fn push_output(&self, code: i32, stdout: &str, stderr: &str) {
        self.responses.borrow_mut().push_back(Response {
            output: ProcessOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
            action: None,
        });
    }

    /// Queue a result plus a side effect run when the invocation happens
    pub fn push_action(&self, code: i32, stdout: &str, action: impl Fn(&Invocation) + 'static) {
        self.responses.borrow_mut().push_back(Response {
            output: ProcessOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
            action: Some(Box::new(action)),
        });
    }

    /// Invocations seen so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    fn next(&self, cmd: &Invocation) -> ProcessOutput {
        self.calls.borrow_mut().push(cmd.clone());
        let response = self
            .responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected invocation: {}", cmd));
        if let Some(action) = &response.action {
            action(cmd);
        }
        response.output
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&self, cmd: &Invocation) -> Result<ProcessOutput, ProcessError> {
        Ok(self.next(cmd))
    }

    fn status(&self, cmd: &Invocation) -> Result<Option<i32>, ProcessError> {
        Ok(self.next(cmd).code)
    }

    fn stream(
        &self,
        cmd: &Invocation,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<Option<i32>, ProcessError> {
        let output = self.next(cmd);
        for line in output.stdout.lines() {
            on_line(line);
        }
        Ok(output.code)
    }
}
