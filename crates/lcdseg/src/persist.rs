//! Calibration cache persistence.
//!
//! The cache is a line-oriented text file, one observation per line:
//!
//! ```text
//! <digit_index>,<segment_index>,<min>,<max>
//! ```
//!
//! Segment indices 0..6 are the seven segments in canonical order, 7 is the
//! decimal point. Lines may appear in any order; duplicate slots keep the
//! widest `[min, max]` range. Any malformed line or out-of-range index
//! rejects the whole file and leaves in-memory calibration untouched.

use std::path::Path;

use crate::decoder::PanelDecoder;
use crate::template::DP_SLOT;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while saving or loading a calibration cache.
#[derive(Debug)]
pub enum PersistenceError {
    /// Underlying file I/O failed.
    Io(std::io::Error),
    /// A line does not parse as `digit,segment,min,max`.
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
    /// A line names a digit or segment the layout does not have.
    IndexOutOfRange {
        /// 1-based line number.
        line: usize,
        /// Digit index found on the line.
        digit: usize,
        /// Segment index found on the line.
        segment: usize,
    },
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "calibration file I/O: {}", e),
            Self::Syntax { line, reason } => {
                write!(f, "calibration file line {}: {}", line, reason)
            }
            Self::IndexOutOfRange {
                line,
                digit,
                segment,
            } => write!(
                f,
                "calibration file line {}: index out of range (digit {}, segment {})",
                line, digit, segment
            ),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ── Parsed representation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct CacheLine {
    digit: usize,
    segment: usize,
    min: u8,
    max: u8,
}

fn parse_line(lineno: usize, text: &str) -> Result<CacheLine, PersistenceError> {
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 4 {
        return Err(PersistenceError::Syntax {
            line: lineno,
            reason: format!("expected 4 comma-separated fields, found {}", fields.len()),
        });
    }
    let field = |i: usize, name: &str| -> Result<usize, PersistenceError> {
        fields[i]
            .trim()
            .parse::<usize>()
            .map_err(|e| PersistenceError::Syntax {
                line: lineno,
                reason: format!("{}: {}", name, e),
            })
    };
    let digit = field(0, "digit index")?;
    let segment = field(1, "segment index")?;
    let min = field(2, "min")?;
    let max = field(3, "max")?;
    if min > 255 || max > 255 {
        return Err(PersistenceError::Syntax {
            line: lineno,
            reason: "luminance outside 0..255".to_string(),
        });
    }
    Ok(CacheLine {
        digit,
        segment,
        min: min as u8,
        max: max as u8,
    })
}

impl PanelDecoder {
    /// Write the full calibration state, one line per sample slot.
    ///
    /// Uncalibrated slots are written with their neutral `(0, 255)` range so
    /// the file always describes every slot the layout has.
    pub fn save_calibration(&self, path: &Path) -> Result<(), PersistenceError> {
        let mut out = String::new();
        for (d, tpl) in self.templates.iter().enumerate() {
            for slot in 0..7 {
                let (min, max) = tpl.range(slot);
                out.push_str(&format!("{},{},{},{}\n", d, slot, min, max));
            }
            if tpl.dp.is_some() {
                let (min, max) = tpl.range(DP_SLOT);
                out.push_str(&format!("{},{},{},{}\n", d, DP_SLOT, min, max));
            }
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    /// Replace the in-memory calibration with the contents of a cache file.
    ///
    /// The file is parsed and validated in full before any state changes;
    /// on error the in-memory calibration is untouched. Slots the file does
    /// not mention are reset to the neutral uncalibrated range.
    pub fn load_calibration(&mut self, path: &Path) -> Result<(), PersistenceError> {
        let text = std::fs::read_to_string(path)?;
        let mut lines = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let lineno = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed = parse_line(lineno, trimmed)?;
            let slot_ok = parsed.digit < self.templates.len()
                && (parsed.segment < 7
                    || (parsed.segment == DP_SLOT
                        && self.templates[parsed.digit].dp.is_some()));
            if !slot_ok {
                return Err(PersistenceError::IndexOutOfRange {
                    line: lineno,
                    digit: parsed.digit,
                    segment: parsed.segment,
                });
            }
            lines.push(parsed);
        }

        // Full file accepted; now commit.
        for tpl in &mut self.templates {
            for slot in 0..8 {
                tpl.reset(slot);
            }
        }
        let mut touched = vec![[false; 8]; self.templates.len()];
        for l in lines {
            let tpl = &mut self.templates[l.digit];
            if touched[l.digit][l.segment] {
                // Duplicate slot: keep the widest range.
                let (min, max) = tpl.range(l.segment);
                tpl.restore(l.segment, min.min(l.min), max.max(l.max));
            } else {
                tpl.restore(l.segment, l.min, l.max);
                touched[l.digit][l.segment] = true;
            }
        }
        Ok(())
    }
}
