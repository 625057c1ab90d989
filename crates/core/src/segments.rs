use crate::models::TimedSegment;

/// Renders timed segments as `[start → end] text` lines in chronological order.
pub fn format_segments(segments: &[TimedSegment]) -> String {
    let mut ordered: Vec<&TimedSegment> = segments.iter().collect();
    ordered.sort_by(|left, right| left.start.total_cmp(&right.start));

    ordered
        .into_iter()
        .map(format_segment)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_segment(segment: &TimedSegment) -> String {
    format!(
        "[{:.2} → {:.2}] {}",
        segment.start,
        segment.end,
        segment.text.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> TimedSegment {
        TimedSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn segments_use_two_decimal_timestamps() {
        let formatted = format_segments(&[segment(0.0, 2.5, " 안녕하세요"), segment(2.5, 4.126, "반갑습니다")]);
        assert_eq!(
            formatted,
            "[0.00 → 2.50] 안녕하세요\n[2.50 → 4.13] 반갑습니다"
        );
    }

    #[test]
    fn segments_are_emitted_in_start_order() {
        let formatted = format_segments(&[segment(5.0, 6.0, "second"), segment(1.0, 2.0, "first")]);
        assert!(formatted.starts_with("[1.00 → 2.00] first"));
        assert!(formatted.ends_with("[5.00 → 6.00] second"));
    }

    #[test]
    fn no_segments_yield_empty_text() {
        assert_eq!(format_segments(&[]), "");
    }
}
