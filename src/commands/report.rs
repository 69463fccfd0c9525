//! Test report tables

use mbedgtw_runner::RunSummary;

/// Plain text table with columns sized to their content
struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(String::len)
                    .chain(std::iter::once(h.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: Vec<&str>| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        let separator = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");

        let mut out = String::new();
        out.push_str(&line(self.headers.clone()));
        out.push('\n');
        out.push_str(&separator);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
            out.push('\n');
        }
        out
    }
}

/// Suite and test case tables for a finished run
pub fn render_summary(summary: &RunSummary) -> String {
    let mut suites = Table::new(&["target", "platform_name", "test suite", "result"]);
    let mut cases = Table::new(&["target", "test suite", "test case", "passed", "failed", "result"]);

    for suite in &summary.suites {
        suites.push(vec![
            suite.target_id.clone(),
            suite.build.clone(),
            suite.test.clone(),
            suite.result.to_string(),
        ]);
        for case in &suite.report.test_cases {
            cases.push(vec![
                suite.target_id.clone(),
                suite.test.clone(),
                case.name.clone(),
                case.passed.to_string(),
                case.failed.to_string(),
                case.result().to_string(),
            ]);
        }
    }

    let mut out = String::from("test suite report:\n");
    out.push_str(&suites.render());
    if !cases.rows.is_empty() {
        out.push_str("\ntest case report:\n");
        out.push_str(&cases.render());
    }
    out
}

/// Print the report and return the run's exit code
pub fn print_summary(summary: &RunSummary) -> i32 {
    println!();
    print!("{}", render_summary(summary));

    let failed = summary.suites.iter().filter(|s| !s.result.is_ok()).count();
    if failed == 0 {
        log::info!("All {} test suite(s) passed", summary.suites.len());
    } else {
        log::error!("{} of {} test suite(s) failed", failed, summary.suites.len());
    }
    summary.exit_code()
}
