//! Incremental telemetry parser.
//!
//! Extracts structured events from streamed analysis text. Text arrives in
//! arbitrary fragments, so a carry buffer holds unmatched text until a
//! marker completes; matched spans are consumed exactly once. The parser is
//! pure protocol: it never synthesizes events the stream did not report.

use crate::defaults;
use crate::telemetry::event::TelemetryEvent;
use regex::Regex;

/// Configuration for the telemetry parser.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Characters of fed text retained for display.
    pub display_capacity: usize,
    /// Upper bound on the unmatched carry tail.
    pub carry_capacity: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            display_capacity: defaults::DISPLAY_BUFFER_CHARS,
            carry_capacity: 1024,
        }
    }
}

/// Incremental parser for streamed telemetry text.
pub struct TelemetryParser {
    config: ParserConfig,
    /// Unconsumed text, possibly ending in a partial marker.
    carry: String,
    /// Tail of the fed text kept for the UI caption.
    display: String,
    update_re: Regex,
    alert_re: Regex,
    log_re: Regex,
}

impl TelemetryParser {
    /// Creates a parser with default configuration.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Creates a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        // The patterns are fixed protocol vocabulary; compilation cannot
        // fail, but the constructor avoids unwrap all the same.
        let update_re = Regex::new(
            r"(?i)\[AXON_UPDATE\]\s+THREAT:\s*(\d+)\s*,\s*STRENGTH:\s*(\d+)\s*,\s*NOISE:\s*(\d+(?:\.\d+)?)",
        );
        let alert_re = Regex::new(r"(?i)\[ALERT:\s*([^\]]*)\]\s*([^\n]*)");
        let log_re = Regex::new(r"(?i)\[LOG\]");
        match (update_re, alert_re, log_re) {
            (Ok(update_re), Ok(alert_re), Ok(log_re)) => Self {
                config,
                carry: String::new(),
                display: String::new(),
                update_re,
                alert_re,
                log_re,
            },
            _ => unreachable!("telemetry patterns are statically valid"),
        }
    }

    /// Feeds one text fragment and returns every event it completes.
    ///
    /// A fragment may complete zero, one or several markers; markers split
    /// across fragments are held until the missing piece arrives. Events are
    /// returned in the order their markers appear in the stream.
    pub fn feed(&mut self, chunk: &str) -> Vec<TelemetryEvent> {
        self.push_display(chunk);
        self.carry.push_str(chunk);

        let mut found: Vec<(usize, TelemetryEvent)> = Vec::new();
        let mut consumed = 0usize;

        for caps in self.update_re.captures_iter(&self.carry) {
            let Some(span) = caps.get(0) else { continue };
            consumed = consumed.max(span.end());
            // Numeric fields outside u8 range mean a malformed line: the
            // span is consumed but no event is emitted.
            let threat = caps.get(1).and_then(|m| m.as_str().parse::<u8>().ok());
            let strength = caps.get(2).and_then(|m| m.as_str().parse::<u8>().ok());
            let noise = caps.get(3).and_then(|m| m.as_str().parse::<f32>().ok());
            if let (Some(threat), Some(signal_strength), Some(noise_variance)) =
                (threat, strength, noise)
            {
                found.push((
                    span.start(),
                    TelemetryEvent::ScoreUpdate {
                        threat: threat.min(100),
                        signal_strength: signal_strength.min(100),
                        noise_variance,
                    },
                ));
            }
        }

        let mut alert_seen = false;
        for caps in self.alert_re.captures_iter(&self.carry) {
            let Some(span) = caps.get(0) else { continue };
            alert_seen = true;
            consumed = consumed.max(span.end());
            let category = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let description = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            found.push((
                span.start(),
                TelemetryEvent::Alert {
                    category: category.to_string(),
                    description: description.to_string(),
                },
            ));
        }

        // [LOG] yields one note from the last marker, and only when no alert
        // claimed this scan. The span is consumed either way so a suppressed
        // note cannot resurface on the next feed.
        if let Some(marker) = self.log_re.find_iter(&self.carry).last() {
            let rest = &self.carry[marker.end()..];
            let line_end = rest.find('\n').unwrap_or(rest.len());
            consumed = consumed.max(marker.end() + line_end);
            if !alert_seen {
                let description = rest[..line_end].trim().to_string();
                found.push((marker.start(), TelemetryEvent::LogNote { description }));
            }
        }

        self.carry.drain(..consumed);
        self.trim_carry();

        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, event)| event).collect()
    }

    /// Current display tail (most recent characters of streamed text).
    pub fn display_text(&self) -> &str {
        &self.display
    }

    /// Clears the display tail; called when the session signals turn
    /// completion.
    pub fn reset_display(&mut self) {
        self.display.clear();
    }

    fn push_display(&mut self, chunk: &str) {
        self.display.push_str(chunk);
        let count = self.display.chars().count();
        if count > self.config.display_capacity {
            let excess = count - self.config.display_capacity;
            if let Some((idx, _)) = self.display.char_indices().nth(excess) {
                self.display.drain(..idx);
            }
        }
    }

    fn trim_carry(&mut self) {
        let count = self.carry.chars().count();
        if count > self.config.carry_capacity {
            let excess = count - self.config.carry_capacity;
            if let Some((idx, _)) = self.carry.char_indices().nth(excess) {
                self.carry.drain(..idx);
            }
        }
    }
}

impl Default for TelemetryParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_update_line_emits_one_event() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("[AXON_UPDATE] THREAT: 72, STRENGTH: 88, NOISE: 1.25\n");

        assert_eq!(
            events,
            vec![TelemetryEvent::ScoreUpdate {
                threat: 72,
                signal_strength: 88,
                noise_variance: 1.25,
            }]
        );
    }

    #[test]
    fn test_update_is_case_insensitive() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("[axon_update] threat: 5, strength: 50, noise: 0.5\n");

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            TelemetryEvent::ScoreUpdate { threat: 5, .. }
        ));
    }

    #[test]
    fn test_update_split_across_feeds() {
        let mut parser = TelemetryParser::new();

        assert!(parser.feed("[AXON_UPD").is_empty());
        let events = parser.feed("ATE] THREAT: 10, STRENGTH: 90, NOISE: 0.1");

        assert_eq!(
            events,
            vec![TelemetryEvent::ScoreUpdate {
                threat: 10,
                signal_strength: 90,
                noise_variance: 0.1,
            }]
        );
    }

    #[test]
    fn test_consumed_update_is_not_re_emitted() {
        let mut parser = TelemetryParser::new();

        let first = parser.feed("[AXON_UPDATE] THREAT: 10, STRENGTH: 90, NOISE: 0.1");
        assert_eq!(first.len(), 1);

        let second = parser.feed(" trailing commentary with no markers");
        assert!(second.is_empty());
    }

    #[test]
    fn test_overflowing_numeric_field_ignores_line() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("[AXON_UPDATE] THREAT: 999, STRENGTH: 88, NOISE: 1.0\n");
        assert!(events.is_empty());

        // The malformed span is consumed; a following valid line still works.
        let events = parser.feed("[AXON_UPDATE] THREAT: 20, STRENGTH: 80, NOISE: 0.2\n");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_values_above_100_clamp() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("[AXON_UPDATE] THREAT: 150, STRENGTH: 200, NOISE: 0.0\n");

        assert_eq!(
            events,
            vec![TelemetryEvent::ScoreUpdate {
                threat: 100,
                signal_strength: 100,
                noise_variance: 0.0,
            }]
        );
    }

    #[test]
    fn test_alert_with_known_category() {
        let mut parser = TelemetryParser::new();
        let events =
            parser.feed("[ALERT: Manipulated Sign] High-frequency pattern on stop sign\n");

        assert_eq!(
            events,
            vec![TelemetryEvent::Alert {
                category: "Manipulated Sign".to_string(),
                description: "High-frequency pattern on stop sign".to_string(),
            }]
        );
    }

    #[test]
    fn test_alert_with_unknown_category_is_still_emitted() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("[ALERT: Sensor Drift] Unexpected parallax\n");

        assert_eq!(
            events,
            vec![TelemetryEvent::Alert {
                category: "Sensor Drift".to_string(),
                description: "Unexpected parallax".to_string(),
            }]
        );
    }

    #[test]
    fn test_alert_takes_precedence_over_log() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("[ALERT: Image Noise] Interference spike [LOG] routine\n");

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TelemetryEvent::Alert { .. }));

        // The suppressed log span must not resurface later.
        assert!(parser.feed("no markers here").is_empty());
    }

    #[test]
    fn test_log_note_uses_last_marker_up_to_newline() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed("status [LOG] first [LOG] second note\nrest");

        assert_eq!(
            events,
            vec![TelemetryEvent::LogNote {
                description: "second note".to_string(),
            }]
        );
    }

    #[test]
    fn test_multiple_markers_in_one_chunk_in_stream_order() {
        let mut parser = TelemetryParser::new();
        let events = parser.feed(
            "[AXON_UPDATE] THREAT: 30, STRENGTH: 70, NOISE: 0.4\n[ALERT: Logic Error] Car moving against traffic\n",
        );

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TelemetryEvent::ScoreUpdate { .. }));
        assert!(matches!(events[1], TelemetryEvent::Alert { .. }));
    }

    #[test]
    fn test_plain_text_emits_nothing() {
        let mut parser = TelemetryParser::new();
        assert!(parser.feed("The intersection looks clear.").is_empty());
    }

    #[test]
    fn test_display_buffer_keeps_tail() {
        let mut parser = TelemetryParser::with_config(ParserConfig {
            display_capacity: 10,
            ..Default::default()
        });

        parser.feed("abcdefghij");
        parser.feed("KLM");
        assert_eq!(parser.display_text(), "defghijKLM");
    }

    #[test]
    fn test_display_buffer_is_char_boundary_safe() {
        let mut parser = TelemetryParser::with_config(ParserConfig {
            display_capacity: 4,
            ..Default::default()
        });

        parser.feed("ααββγγ");
        assert_eq!(parser.display_text(), "ββγγ");
    }

    #[test]
    fn test_reset_display_clears_tail_only() {
        let mut parser = TelemetryParser::new();

        parser.feed("[AXON_UPD");
        parser.reset_display();
        assert_eq!(parser.display_text(), "");

        // The carry buffer survives the display reset.
        let events = parser.feed("ATE] THREAT: 1, STRENGTH: 99, NOISE: 0.0");
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_carry_stays_bounded() {
        let mut parser = TelemetryParser::with_config(ParserConfig {
            carry_capacity: 64,
            ..Default::default()
        });

        for _ in 0..100 {
            parser.feed("filler text without any markers whatsoever ");
        }
        assert!(parser.carry.chars().count() <= 64);
    }
}
