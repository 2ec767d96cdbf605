//! Prompt Templates (spec.md §4.5): per-category preamble, optional
//! cheat sheet, and the format contract the handler must enforce
//! downstream. Mirrors `router/prompts.rs`'s per-task prompt assembly,
//! generalized from six task types to the nine [`Category`] values.

use crate::domain::Category;

/// The format contract a category's final answer must satisfy, stated
/// in prose for injection into the prompt (spec.md §4.5). Handlers and
/// the refiner both consult [`format_contract`] so the wording the model
/// sees matches what the refiner actually enforces.
pub fn format_contract(category: Category) -> &'static str {
    match category {
        Category::Reasoning => {
            "End your answer with a single line containing exactly one uppercase letter from A to E, and nothing else on that line."
        }
        Category::Math => {
            "End your answer with a line of the exact form `#### N` where N is the final numeric answer, with no thousands separators."
        }
        Category::Coding => {
            "Return a single fenced code block containing a complete function definition matching the requested signature. Do not include prose inside the fence."
        }
        Category::Rag => {
            "Return a single comma-separated list of passage IDs, ordered most-relevant first, and nothing else."
        }
        Category::LongContext => {
            "Return only the exact needle string you found, with no surrounding text, quotation marks, or explanation."
        }
        Category::Multilingual => "Answer in the language the question was asked in.",
        Category::ToolUse => "State the final answer plainly, prefixed with `Answer: ` on its own line.",
        Category::Dialogue => "Respond conversationally and directly to the user.",
        Category::General => "Answer the question directly and concisely.",
    }
}

/// An optional cheat sheet of formulae/checklists/format rules injected
/// ahead of the user's prompt. Empty string for categories with nothing
/// worth injecting beyond the format contract.
pub fn cheat_sheet(category: Category) -> &'static str {
    match category {
        Category::Math => {
            "Reminders: order of operations is parentheses, exponents, then left-to-right for */ and +-. \
             Show each arithmetic step explicitly so it can be checked."
        }
        Category::Coding => {
            "Checklist: handle empty input, off-by-one bounds, and the signature's exact parameter and return types. \
             Write only the function body requested, not a full program."
        }
        Category::Rag => "Use only the supplied passages. Do not introduce facts that are not present in them.",
        Category::Reasoning => {
            "Eliminate options you can rule out first, then choose among what remains."
        }
        _ => "",
    }
}

const PREAMBLE: &str = "You are one component in a multi-model answering pipeline. Follow the instructions exactly.";

/// Assembles the system preamble for `category`. The caller (a handler)
/// still supplies the user turn and any tool-results block via
/// [`crate::domain::PromptEnvelope`].
pub fn system_preamble(category: Category) -> String {
    let sheet = cheat_sheet(category);
    let contract = format_contract(category);
    if sheet.is_empty() {
        format!("{PREAMBLE}\n\nTask category: {category}.\n\n{contract}")
    } else {
        format!("{PREAMBLE}\n\nTask category: {category}.\n\n{sheet}\n\n{contract}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_contract_mentions_hash_marker() {
        assert!(format_contract(Category::Math).contains("####"));
    }

    #[test]
    fn reasoning_contract_mentions_letter_range() {
        assert!(format_contract(Category::Reasoning).contains("A to E"));
    }

    #[test]
    fn general_category_has_no_cheat_sheet() {
        assert_eq!(cheat_sheet(Category::General), "");
    }

    #[test]
    fn preamble_embeds_category_name() {
        let text = system_preamble(Category::Coding);
        assert!(text.contains("coding"));
    }
}
