// src/cli/progress.rs — Terminal progress renderer for the research timeline

use crate::core::types::ProgressEvent;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the answer.
/// Returns a closure suitable for `ResearchOrchestrator::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

/// One line per lifecycle event.
pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::QueriesGenerated { queries } => {
            if queries.is_empty() {
                "[queries] none generated".to_string()
            } else {
                format!("[queries] {}", queries.join(" | "))
            }
        }
        ProgressEvent::WaveStarted { round, queries } => {
            format!("[round {}] searching {} query(ies)...", round, queries.len())
        }
        ProgressEvent::SearchCompleted {
            query,
            sources,
            degraded,
        } => {
            if *degraded {
                format!("  [search] {} -> failed", query)
            } else {
                format!("  [search] {} -> {} source(s)", query, sources)
            }
        }
        ProgressEvent::Reflected {
            round,
            sufficient,
            knowledge_gap,
            follow_up_queries,
        } => {
            if *sufficient {
                format!("[reflect {}] sufficient", round)
            } else {
                format!(
                    "[reflect {}] gap: {} ({} follow-up(s))",
                    round,
                    knowledge_gap,
                    follow_up_queries.len()
                )
            }
        }
        ProgressEvent::Finalized { sources_used } => {
            format!("[done] answer written, {} source(s) cited", sources_used)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_queries_generated_format() {
        let msg = format_event(&ProgressEvent::QueriesGenerated {
            queries: vec!["rust 1.0 release".into(), "rust edition 2024".into()],
        });
        assert_eq!(msg, "[queries] rust 1.0 release | rust edition 2024");
    }

    #[test]
    fn test_no_queries_format() {
        let msg = format_event(&ProgressEvent::QueriesGenerated { queries: vec![] });
        assert_eq!(msg, "[queries] none generated");
    }

    #[test]
    fn test_wave_started_format() {
        let msg = format_event(&ProgressEvent::WaveStarted {
            round: 2,
            queries: vec!["a".into(), "b".into()],
        });
        assert_eq!(msg, "[round 2] searching 2 query(ies)...");
    }

    #[test]
    fn test_search_completed_format() {
        let ok = format_event(&ProgressEvent::SearchCompleted {
            query: "ferris".into(),
            sources: 3,
            degraded: false,
        });
        assert_eq!(ok, "  [search] ferris -> 3 source(s)");

        let failed = format_event(&ProgressEvent::SearchCompleted {
            query: "ferris".into(),
            sources: 0,
            degraded: true,
        });
        assert_eq!(failed, "  [search] ferris -> failed");
    }

    #[test]
    fn test_reflected_format() {
        let gap = format_event(&ProgressEvent::Reflected {
            round: 1,
            sufficient: false,
            knowledge_gap: "release date".into(),
            follow_up_queries: vec!["when".into()],
        });
        assert_eq!(gap, "[reflect 1] gap: release date (1 follow-up(s))");

        let done = format_event(&ProgressEvent::Reflected {
            round: 2,
            sufficient: true,
            knowledge_gap: String::new(),
            follow_up_queries: vec![],
        });
        assert_eq!(done, "[reflect 2] sufficient");
    }

    #[test]
    fn test_finalized_format() {
        let msg = format_event(&ProgressEvent::Finalized { sources_used: 4 });
        assert_eq!(msg, "[done] answer written, 4 source(s) cited");
    }
}
