use serde::{Deserialize, Serialize};

/// Replace `source[start..end]` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Patch {
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Patch {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn remove(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }
}

/// Apply non-overlapping patches to `source`.
///
/// Patches are applied from the highest start offset down, so an applied edit
/// never shifts the offsets of one still pending. Overlapping patches are not
/// merged or repaired.
pub fn apply_patches(source: &str, patches: &[Patch]) -> String {
    let mut ordered: Vec<&Patch> = patches.iter().collect();
    // Sort reverse to apply safely
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    ordered
        .into_iter()
        .fold(source.to_string(), |mut acc, patch| {
            debug_assert!(patch.start <= patch.end && patch.end <= acc.len());
            acc.replace_range(patch.start..patch.end, &patch.text);
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_applies_in_descending_offset_order() {
        let source = "<a v-can=\"x\">A</a>";
        let patches = vec![
            Patch::replace(3, 12, "v-if=\"__can__('a', 'b')\""),
            Patch::replace(13, 14, "Allowed"),
        ];
        assert_eq!(
            apply_patches(source, &patches),
            "<a v-if=\"__can__('a', 'b')\">Allowed</a>"
        );
    }

    #[test]
    fn test_result_is_independent_of_input_order() {
        let source = "0123456789";
        let patches = vec![
            Patch::replace(0, 1, "zero"),
            Patch::remove(4, 6),
            Patch::replace(9, 10, "nine"),
            Patch::replace(7, 7, "+"),
        ];
        let expected = "zero1236+78nine";
        assert_eq!(apply_patches(source, &patches), expected);

        let mut reversed = patches.clone();
        reversed.reverse();
        assert_eq!(apply_patches(source, &reversed), expected);

        let rotated: Vec<Patch> = patches[2..].iter().chain(&patches[..2]).cloned().collect();
        assert_eq!(apply_patches(source, &rotated), expected);
    }

    #[test]
    fn test_no_patches_is_identity() {
        assert_eq!(apply_patches("<p/>", &[]), "<p/>");
    }
}
