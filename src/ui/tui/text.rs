use ftui::Style;
use ftui::text::{
    Line as FtLine, Span as FtSpan, display_width as text_display_width,
    graphemes as text_graphemes,
};

pub(super) fn truncate_to_display_width(value: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text_display_width(value) <= max_width {
        return value.to_string();
    }
    if max_width == 1 {
        return "…".to_string();
    }

    let mut out = String::new();
    let mut width = 0usize;
    let target_width = max_width.saturating_sub(1);
    for grapheme in text_graphemes(value) {
        let grapheme_width = text_display_width(grapheme);
        if width.saturating_add(grapheme_width) > target_width {
            break;
        }
        out.push_str(grapheme);
        width = width.saturating_add(grapheme_width);
    }
    out.push('…');
    out
}

pub(super) fn pad_or_truncate_to_display_width(value: &str, width: usize) -> String {
    let mut out = truncate_to_display_width(value, width);
    let used = text_display_width(out.as_str());
    if used < width {
        out.push_str(&" ".repeat(width.saturating_sub(used)));
    }
    out
}

fn spans_display_width(spans: &[FtSpan<'static>]) -> usize {
    spans
        .iter()
        .map(|span| text_display_width(span.content.as_ref()))
        .sum()
}

fn truncate_spans_to_width(spans: &[FtSpan<'static>], max_width: usize) -> Vec<FtSpan<'static>> {
    let mut out = Vec::new();
    let mut used = 0usize;

    for span in spans {
        let span_width = text_display_width(span.content.as_ref());
        if used.saturating_add(span_width) <= max_width {
            out.push(span.clone());
            used = used.saturating_add(span_width);
            continue;
        }

        let remaining = max_width.saturating_sub(used);
        if remaining > 0 {
            let clipped = truncate_to_display_width(span.content.as_ref(), remaining);
            out.push(match span.style {
                Some(style) => FtSpan::styled(clipped, style),
                None => FtSpan::raw(clipped),
            });
        }
        break;
    }

    out
}

/// One full-width bar with left-aligned and right-aligned span groups, the
/// gap filled with the base style.
pub(super) fn chrome_bar_line(
    width: usize,
    base_style: Style,
    left: Vec<FtSpan<'static>>,
    right: Vec<FtSpan<'static>>,
) -> FtLine<'static> {
    if width == 0 {
        return FtLine::raw("");
    }

    let right = truncate_spans_to_width(&right, width);
    let right_width = spans_display_width(&right);
    let right_start = width.saturating_sub(right_width);

    let left = truncate_spans_to_width(&left, right_start);
    let left_width = spans_display_width(&left);

    let mut spans: Vec<FtSpan<'static>> = Vec::new();
    spans.extend(left);
    let mut cursor = left_width;

    if right_start > cursor {
        spans.push(FtSpan::styled(
            " ".repeat(right_start.saturating_sub(cursor)),
            base_style,
        ));
    }
    spans.extend(right);
    cursor = right_start.saturating_add(right_width).max(cursor);

    if width > cursor {
        spans.push(FtSpan::styled(
            " ".repeat(width.saturating_sub(cursor)),
            base_style,
        ));
    }

    FtLine::from_spans(spans)
}
