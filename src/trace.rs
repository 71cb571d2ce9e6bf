use std::collections::VecDeque;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceCategory {
    Binding,
    Dispatch,
}

/// Bounded in-memory trace of binding and dispatch activity.
///
/// Lines are only recorded while tracing is enabled. When `emit` is set each
/// recorded line is also sent to the `tracing` subscriber.
#[derive(Debug, Clone)]
pub(crate) struct TraceLog {
    enabled: bool,
    bindings: bool,
    dispatch: bool,
    emit: bool,
    limit: usize,
    lines: VecDeque<String>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self {
            enabled: false,
            bindings: true,
            dispatch: true,
            emit: true,
            limit: 10_000,
            lines: VecDeque::new(),
        }
    }
}

impl TraceLog {
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_bindings(&mut self, enabled: bool) {
        self.bindings = enabled;
    }

    pub(crate) fn set_dispatch(&mut self, enabled: bool) {
        self.dispatch = enabled;
    }

    pub(crate) fn set_emit(&mut self, enabled: bool) {
        self.emit = enabled;
    }

    pub(crate) fn set_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "trace log limit requires at least 1 entry".into(),
            ));
        }
        self.limit = max_entries;
        while self.lines.len() > self.limit {
            self.lines.pop_front();
        }
        Ok(())
    }

    pub(crate) fn wants(&self, category: TraceCategory) -> bool {
        self.enabled
            && match category {
                TraceCategory::Binding => self.bindings,
                TraceCategory::Dispatch => self.dispatch,
            }
    }

    /// Records `line` if the category is active. Callers guard expensive
    /// formatting with [`TraceLog::wants`].
    pub(crate) fn record(&mut self, category: TraceCategory, line: String) {
        if !self.wants(category) {
            return;
        }
        if self.emit {
            tracing::debug!(target: "handob", category = ?category, "{line}");
        }
        if self.lines.len() >= self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_recorded_while_disabled() {
        let mut log = TraceLog::default();
        log.record(TraceCategory::Dispatch, "[handler] click".into());
        assert!(log.take().is_empty());
    }

    #[test]
    fn categories_filter_lines() {
        let mut log = TraceLog::default();
        log.set_enabled(true);
        log.set_bindings(false);
        log.record(TraceCategory::Binding, "[bind] click".into());
        log.record(TraceCategory::Dispatch, "[handler] click".into());
        assert_eq!(log.take(), vec!["[handler] click"]);

        log.set_bindings(true);
        log.set_dispatch(false);
        log.record(TraceCategory::Binding, "[bind] click".into());
        log.record(TraceCategory::Dispatch, "[handler] click".into());
        assert_eq!(log.take(), vec!["[bind] click"]);
    }

    #[test]
    fn limit_keeps_latest_lines() -> Result<()> {
        let mut log = TraceLog::default();
        log.set_enabled(true);
        log.set_emit(false);
        for idx in 0..5 {
            log.record(TraceCategory::Dispatch, format!("line {idx}"));
        }
        log.set_limit(2)?;
        assert_eq!(log.take(), vec!["line 3", "line 4"]);
        log.record(TraceCategory::Dispatch, "a".into());
        log.record(TraceCategory::Dispatch, "b".into());
        log.record(TraceCategory::Dispatch, "c".into());
        assert_eq!(log.take(), vec!["b", "c"]);
        Ok(())
    }

    #[test]
    fn zero_limit_is_rejected() {
        let mut log = TraceLog::default();
        assert!(matches!(log.set_limit(0), Err(Error::InvalidConfig(_))));
    }
}
