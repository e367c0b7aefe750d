//! Textual stack trace parsing.
//!
//! Two frame shapes are recognised:
//! - single-line frames: `at method (file:line:col)`, `method@file:line:col`
//! - `std::backtrace` frames: `N: symbol` followed by `at file:line:col`
//!
//! Lines matching neither shape (messages, notes) are skipped. Parsing never
//! fails; missing pieces fall back to placeholder values.

use std::sync::OnceLock;

use regex::Regex;

use crate::contracts::StackFrame;

pub const NO_METHOD: &str = "<no_method>";
pub const NO_FILENAME: &str = "<no_filename>";

/// Serialized size of a frame with empty strings and no digits.
const FRAME_BASE_SIZE: usize = 58;

/// Upper bound on the serialized size of a parsed stack.
pub const MAX_PARSED_STACK_BYTES: usize = 32 * 1024;

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\s+at)?(.*?)(@|\s\(|\s)([^(\n]+):(\d+):(\d+)(\)?)$")
            .expect("location pattern compiles")
    })
}

fn symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d+):\s+(\S.*?)\s*$").expect("symbol pattern compiles")
    })
}

/// Parse a stack trace into frames, bounded to [`MAX_PARSED_STACK_BYTES`].
pub fn parse_stack(stack: &str) -> Vec<StackFrame> {
    let mut frames = Vec::new();
    let mut pending: Option<(String, String)> = None;

    for line in stack.lines() {
        if let Some(caps) = symbol_pattern().captures(line) {
            if let Some((raw, symbol)) = pending.take() {
                frames.push(symbol_only_frame(frames.len(), raw, symbol));
            }
            pending = Some((line.trim().to_string(), caps[2].to_string()));
            continue;
        }

        let Some(caps) = location_pattern().captures(line) else {
            continue;
        };

        let (assembly, symbol) = match pending.take() {
            Some((raw, symbol)) => (format!("{raw} {}", line.trim()), Some(symbol)),
            None => (line.trim().to_string(), None),
        };
        let method = non_empty(&caps[2])
            .or(symbol)
            .unwrap_or_else(|| NO_METHOD.to_string());
        let file_name = non_empty(&caps[4]).unwrap_or_else(|| NO_FILENAME.to_string());
        let line_number = caps[5].parse().unwrap_or(0);

        frames.push(StackFrame {
            level: frames.len(),
            method,
            assembly,
            file_name,
            line: line_number,
        });
    }

    if let Some((raw, symbol)) = pending {
        frames.push(symbol_only_frame(frames.len(), raw, symbol));
    }

    trim_to_budget(&mut frames, MAX_PARSED_STACK_BYTES);
    frames
}

fn symbol_only_frame(level: usize, raw: String, symbol: String) -> StackFrame {
    StackFrame {
        level,
        method: non_empty(&symbol).unwrap_or_else(|| NO_METHOD.to_string()),
        assembly: raw,
        file_name: NO_FILENAME.to_string(),
        line: 0,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn frame_size(frame: &StackFrame) -> usize {
    FRAME_BASE_SIZE
        + frame.method.len()
        + frame.assembly.len()
        + frame.file_name.len()
        + frame.level.to_string().len()
        + frame.line.to_string().len()
}

/// Keep frames from both ends while they fit, dropping the middle.
fn trim_to_budget(frames: &mut Vec<StackFrame>, budget: usize) {
    let total: usize = frames.iter().map(frame_size).sum();
    if total <= budget {
        return;
    }

    let (mut left, mut right) = (0, frames.len());
    let mut size = 0;
    while left < right {
        let head = frame_size(&frames[left]);
        if size + head > budget {
            break;
        }
        size += head;
        left += 1;
        if left == right {
            break;
        }
        let tail = frame_size(&frames[right - 1]);
        if size + tail > budget {
            break;
        }
        size += tail;
        right -= 1;
    }
    frames.drain(left..right);
}
