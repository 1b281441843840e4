use crate::inst::Inst;

/// A run of adjacent instructions whose execution percentages are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileGroup {
    pub percentage: f64,
    pub span: String,
    /// Bracket nesting depth at the first instruction of the span,
    /// used only for display indentation.
    pub indent: usize,
}

/// Group the per-position execution counts into spans covering the whole
/// program. Adjacent positions merge while their percentages are exactly
/// equal; grouping is deliberately not tolerance-based, so programs with
/// many distinct counts produce finely fragmented reports.
pub fn profile(counts: &[u64], code: &[Inst], total: u64) -> Vec<ProfileGroup> {
    debug_assert_eq!(counts.len(), code.len());
    let mut groups: Vec<ProfileGroup> = Vec::new();
    let mut depth = 0usize;
    for (inst, &count) in code.iter().zip(counts) {
        let percentage = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        if matches!(inst, Inst::Close) {
            depth = depth.saturating_sub(1);
        }
        let indent = depth;
        if matches!(inst, Inst::Open) {
            depth += 1;
        }
        match groups.last_mut() {
            Some(last) if last.percentage == percentage => last.span.push_str(&inst.token()),
            _ => groups.push(ProfileGroup {
                percentage,
                span: inst.token(),
                indent,
            }),
        }
    }
    groups
}

/// Plain-text report, one line per group, indented by nesting depth.
pub fn render(groups: &[ProfileGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        out.push_str(&format!(
            "{:>8.3}%  {}{}\n",
            group.percentage,
            "  ".repeat(group.indent),
            group.span
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::decode;

    #[test]
    fn equal_percentages_merge_across_nesting() {
        let code = decode("+[-]").unwrap();
        let counts = vec![1, 2, 2, 2];
        let groups = profile(&counts, &code, 7);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].span, "+");
        assert_eq!(groups[0].indent, 0);
        assert_eq!(groups[1].span, "[-]");
        assert_eq!(groups[1].indent, 0);
        assert_eq!(groups[1].percentage, 2.0 / 7.0 * 100.0);
    }

    #[test]
    fn distinct_counts_fragment() {
        let code = decode("+++").unwrap();
        let counts = vec![1, 2, 1];
        let groups = profile(&counts, &code, 4);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn body_of_a_loop_is_indented() {
        let code = decode("[>]").unwrap();
        let counts = vec![1, 2, 4];
        let groups = profile(&counts, &code, 7);
        assert_eq!(groups[0].indent, 0);
        assert_eq!(groups[1].indent, 1);
        assert_eq!(groups[2].indent, 0);
    }

    #[test]
    fn unexecuted_positions_report_zero() {
        let code = decode("[+]").unwrap();
        let counts = vec![1, 0, 0];
        let groups = profile(&counts, &code, 1);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].percentage, 0.0);
        assert_eq!(groups[1].span, "+]");
    }

    #[test]
    fn zero_total_does_not_divide() {
        let code = decode("+").unwrap();
        let groups = profile(&[0], &code, 0);
        assert_eq!(groups[0].percentage, 0.0);
    }

    #[test]
    fn spans_cover_the_whole_program() {
        let code = decode("3+[->+<]2>").unwrap();
        let counts = vec![1; code.len()];
        let groups = profile(&counts, &code, code.len() as u64);
        let joined: String = groups.iter().map(|g| g.span.as_str()).collect();
        assert_eq!(joined, "3+[->+<]2>");
    }
}
