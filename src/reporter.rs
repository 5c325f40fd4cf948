//! Development-time diff of a rewritten component.

use console::{Style, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLine<'a> {
    Same(&'a str),
    Added(&'a str),
    Removed(&'a str),
}

/// Line-oriented diff of `before` against `after`.
///
/// Common leading and trailing lines are matched directly; the remaining middle
/// is aligned with a longest-common-subsequence table.
pub fn diff_lines<'a>(before: &'a str, after: &'a str) -> Vec<DiffLine<'a>> {
    let old: Vec<&str> = before.lines().collect();
    let new: Vec<&str> = after.lines().collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut out: Vec<DiffLine<'a>> = old[..prefix].iter().map(|l| DiffLine::Same(l)).collect();
    out.extend(lcs_diff(old_mid, new_mid));
    out.extend(old[old.len() - suffix..].iter().map(|l| DiffLine::Same(l)));
    out
}

fn lcs_diff<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffLine<'a>> {
    let (n, m) = (old.len(), new.len());
    // table[i][j]: LCS length of old[i..] and new[j..]
    let mut table = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if old[i] == new[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut out = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            out.push(DiffLine::Same(old[i]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            out.push(DiffLine::Removed(old[i]));
            i += 1;
        } else {
            out.push(DiffLine::Added(new[j]));
            j += 1;
        }
    }
    out.extend(old[i..].iter().map(|l| DiffLine::Removed(l)));
    out.extend(new[j..].iter().map(|l| DiffLine::Added(l)));
    out
}

/// Banner, colored body and footer, one string per output line.
pub fn render(before: &str, after: &str, id: &str) -> Vec<String> {
    let bold = Style::new().bold();
    let green = Style::new().green();
    let red = Style::new().red();

    let mut out = vec![String::new(), bold.apply_to(format!("===== DIFF {} =====", id)).to_string()];
    for line in diff_lines(before, after) {
        out.push(match line {
            DiffLine::Same(text) => text.to_string(),
            DiffLine::Added(text) => green.apply_to(text).to_string(),
            DiffLine::Removed(text) => red.apply_to(text).to_string(),
        });
    }
    out.push(bold.apply_to("============================").to_string());
    out.push(String::new());
    out
}

/// Print the diff between the original and rewritten source to stderr.
pub fn report_template_diff(before: &str, after: &str, id: &str) {
    let term = Term::stderr();
    for line in render(before, after, id) {
        let _ = term.write_line(&line);
    }
}
