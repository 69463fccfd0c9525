//! Host-test harness output parsing
//!
//! The device side of a greentea test talks to `mbedhtrun` with `{{key;value}}`
//! tokens, which the harness echoes into its own output. The tokens we use:
//!
//! - `{{__testcase_finish;<name>;<passed>;<failed>}}` - one test case done
//! - `{{end;<result>}}` - device reports the suite result
//! - `{{result;<result>}}` - harness reports the final suite result
//!
//! Assertion failures show up as `[RXD] :<line>::FAIL: <message>` lines.

use std::fmt;

/// Outcome of a test suite or test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Ok,
    Fail,
    Timeout,
    Error,
}

impl TestResult {
    /// Map a greentea result keyword
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "success" | "ok" | "OK" => Self::Ok,
            "failure" | "fail" | "FAIL" => Self::Fail,
            "timeout" | "TIMEOUT" => Self::Timeout,
            _ => Self::Error,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
            Self::Timeout => "TIMEOUT",
            Self::Error => "ERROR",
        })
    }
}

/// Result of one test case inside a suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseResult {
    pub name: String,
    pub passed: u32,
    pub failed: u32,
}

impl TestCaseResult {
    pub fn result(&self) -> TestResult {
        if self.failed == 0 && self.passed > 0 {
            TestResult::Ok
        } else {
            TestResult::Fail
        }
    }
}

/// Everything collected from one harness run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTestReport {
    pub test_cases: Vec<TestCaseResult>,
    /// Assertion failure messages (`:47::FAIL: Expected 1 Was 0`)
    pub failures: Vec<String>,
    end: Option<String>,
    result: Option<String>,
}

impl HostTestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse complete harness output
    pub fn parse(output: &str) -> Self {
        let mut report = Self::new();
        for line in output.lines() {
            report.consume_line(line);
        }
        report
    }

    /// Feed one output line; returns the assertion failure message if the
    /// line carries one
    pub fn consume_line(&mut self, line: &str) -> Option<&str> {
        for (key, values) in kv_tokens(line) {
            match key {
                "__testcase_finish" => {
                    if let [name, passed, failed, ..] = values.as_slice() {
                        self.test_cases.push(TestCaseResult {
                            name: (*name).to_string(),
                            passed: passed.parse().unwrap_or(0),
                            failed: failed.parse().unwrap_or(1),
                        });
                    }
                }
                "end" => self.end = values.first().map(|v| (*v).to_string()),
                "result" => self.result = values.first().map(|v| (*v).to_string()),
                _ => {}
            }
        }

        let failure = assertion_failure(line)?;
        self.failures.push(failure.to_string());
        self.failures.last().map(String::as_str)
    }

    /// Suite result, falling back to the harness exit code when the output
    /// carries no result token
    pub fn suite_result(&self, exit_code: Option<i32>) -> TestResult {
        match self.result.as_deref().or(self.end.as_deref()) {
            Some(keyword) => TestResult::from_keyword(keyword),
            None if exit_code == Some(0) => TestResult::Ok,
            None => TestResult::Error,
        }
    }
}

/// Extract `{{key;v1;v2}}` tokens from a line
fn kv_tokens(line: &str) -> Vec<(&str, Vec<&str>)> {
    let mut tokens = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find("{{") {
        let body_start = start + 2;
        let Some(len) = rest[body_start..].find("}}") else {
            break;
        };
        let body = &rest[body_start..body_start + len];
        let mut parts = body.split(';');
        if let Some(key) = parts.next() {
            if !key.is_empty() {
                tokens.push((key, parts.collect()));
            }
        }
        rest = &rest[body_start + len + 2..];
    }
    tokens
}

/// `[RXD] :47::FAIL: Expected 1 Was 0` -> `:47::FAIL: Expected 1 Was 0`
fn assertion_failure(line: &str) -> Option<&str> {
    let pos = line.find("[RXD] ")?;
    let message = &line[pos + "[RXD] ".len()..];
    let after_colon = message.strip_prefix(':')?;
    let digits = after_colon
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_colon.len());
    if digits == 0 || !after_colon[digits..].starts_with("::FAIL: ") {
        return None;
    }
    Some(message.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS_OUTPUT: &str = r#"
[1600000000.10][CONN][INF] found KV pair in stream: {{__version;1.3.0}}, queued...
[1600000000.10][CONN][INF] found KV pair in stream: {{__testcase_count;2}}, queued...
[1600000000.20][CONN][RXD] >>> Running case #1: 'test_success_1'...
[1600000000.20][CONN][INF] found KV pair in stream: {{__testcase_finish;test_success_1;1;0}}, queued...
[1600000000.30][CONN][INF] found KV pair in stream: {{__testcase_finish;test_success_2;1;0}}, queued...
[1600000000.30][CONN][INF] found KV pair in stream: {{__testcase_summary;2;0}}, queued...
[1600000000.40][CONN][INF] found KV pair in stream: {{end;success}}, queued...
[1600000000.40][HTST][INF] __exit(0)
{{result;success}}
"#;

    const FAILURE_OUTPUT: &str = r#"
[1600000000.20][CONN][INF] found KV pair in stream: {{__testcase_finish;test_success;1;0}}, queued...
[1600000000.25][CONN][RXD] :47::FAIL: Expected 1 Was 0
[1600000000.30][CONN][INF] found KV pair in stream: {{__testcase_finish;test_failure;0;1}}, queued...
[1600000000.40][CONN][INF] found KV pair in stream: {{end;failure}}, queued...
"#;

    #[test]
    fn test_success_report() {
        let report = HostTestReport::parse(SUCCESS_OUTPUT);
        assert_eq!(report.test_cases.len(), 2);
        assert!(report.test_cases.iter().all(|c| c.result().is_ok()));
        assert!(report.failures.is_empty());
        assert_eq!(report.suite_result(Some(0)), TestResult::Ok);
        // result token wins over the exit code
        assert_eq!(report.suite_result(Some(1)), TestResult::Ok);
    }

    #[test]
    fn test_failure_report() {
        let report = HostTestReport::parse(FAILURE_OUTPUT);
        assert_eq!(report.test_cases[0].result(), TestResult::Ok);
        assert_eq!(report.test_cases[1].name, "test_failure");
        assert_eq!(report.test_cases[1].result(), TestResult::Fail);
        assert_eq!(report.failures, [":47::FAIL: Expected 1 Was 0"]);
        assert_eq!(report.suite_result(Some(0)), TestResult::Fail);
    }

    #[test]
    fn test_exit_code_fallback() {
        let report = HostTestReport::parse("no tokens here\n");
        assert_eq!(report.suite_result(Some(0)), TestResult::Ok);
        assert_eq!(report.suite_result(Some(2)), TestResult::Error);
        assert_eq!(report.suite_result(None), TestResult::Error);
    }

    #[test]
    fn test_consume_line_returns_failure() {
        let mut report = HostTestReport::new();
        assert_eq!(report.consume_line("[CONN][RXD] >>> Running case #2"), None);
        assert_eq!(
            report.consume_line("[1.0][CONN][RXD] :12::FAIL: Expected TRUE"),
            Some(":12::FAIL: Expected TRUE")
        );
        assert_eq!(report.consume_line("[CONN][RXD] ::FAIL: no line"), None);
    }

    #[test]
    fn test_timeout_keyword() {
        let report = HostTestReport::parse("{{result;timeout}}");
        assert_eq!(report.suite_result(Some(0)), TestResult::Timeout);
    }

    #[test]
    fn test_multiple_tokens_on_line() {
        let tokens = kv_tokens("{{a;1}} text {{b;2;3}} {{unterminated");
        assert_eq!(tokens, vec![("a", vec!["1"]), ("b", vec!["2", "3"])]);
    }
}
