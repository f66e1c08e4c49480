//! Result view: holds the parameters it configured the orchestrator with and
//! the latest result list it received.

use tokio::sync::mpsc;

use crate::config::DetectionParams;
use crate::detect::DetectionResult;

pub struct Shell {
    params: DetectionParams,
    latest: Vec<DetectionResult>,
    updates: u64,
}

impl Shell {
    pub fn new(params: DetectionParams) -> Self {
        Self {
            params,
            latest: Vec::new(),
            updates: 0,
        }
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Replace the displayed results.
    pub fn handle_results(&mut self, results: Vec<DetectionResult>) {
        self.updates += 1;
        self.latest = results;
        log::info!("results #{}: {}", self.updates, self.summary());
    }

    pub fn latest(&self) -> &[DetectionResult] {
        &self.latest
    }

    /// Number of result lists received.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Latest results that satisfy the target.
    pub fn matched(&self) -> impl Iterator<Item = &DetectionResult> {
        self.latest.iter().filter(|r| r.matched)
    }

    /// One entry per result: `label certainty% [match]`.
    pub fn summary(&self) -> String {
        if self.latest.is_empty() {
            return format!("no objects (looking for {})", self.params.target_label);
        }
        self.latest
            .iter()
            .map(|r| {
                let mark = if r.matched { " [match]" } else { "" };
                format!("{} {:.0}%{}", r.label, r.confidence * 100.0, mark)
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Consume result lists until the orchestrator drops its sender.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Vec<DetectionResult>>) -> Self {
        while let Some(results) = rx.recv().await {
            self.handle_results(results);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, confidence: f32, matched: bool) -> DetectionResult {
        DetectionResult {
            matched,
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn keeps_only_latest_list() {
        let mut shell = Shell::new(DetectionParams::new("person", 0.7));
        assert_eq!(shell.summary(), "no objects (looking for person)");

        shell.handle_results(vec![result("dog", 0.95, false)]);
        shell.handle_results(vec![result("person", 0.9, true), result("dog", 0.95, false)]);

        assert_eq!(shell.updates(), 2);
        assert_eq!(shell.latest().len(), 2);
        assert_eq!(shell.matched().count(), 1);
        assert_eq!(shell.summary(), "person 90% [match], dog 95%");
    }

    #[tokio::test]
    async fn run_drains_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(vec![result("cup", 0.4, false)]).unwrap();
        tx.send(vec![]).unwrap();
        drop(tx);
        let shell = Shell::new(DetectionParams::new("cup", 0.5)).run(rx).await;
        assert_eq!(shell.updates(), 2);
        assert!(shell.latest().is_empty());
    }
}
