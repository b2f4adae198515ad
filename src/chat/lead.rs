//! Parser for the lead block the model emits once a customer is qualified.
//!
//! ```text
//! [LEAD_NOVO]
//! Nome: <name>
//! Cidade: <city>
//! Valor da Conta: <bill amount>
//! Painel Solar: <Sim|Não>
//! Telefone: <phone>
//! [/LEAD_NOVO]
//! ```
//!
//! Each body line holding a `:` is split once into a trimmed key and value.
//! Other lines are ignored.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

pub const LEAD_START: &str = "[LEAD_NOVO]";
pub const LEAD_END: &str = "[/LEAD_NOVO]";

/// Expected keys, in table column order.
pub const LEAD_FIELDS: [&str; 5] = ["Nome", "Cidade", "Valor da Conta", "Painel Solar", "Telefone"];

static LEAD_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[LEAD_NOVO\](.*?)\[/LEAD_NOVO\]").expect("lead block pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadRecord {
    fields: BTreeMap<String, String>,
}

impl LeadRecord {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Value for `key`, or `""` when the model left it out.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    /// Values of [`LEAD_FIELDS`] in column order.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        LEAD_FIELDS.into_iter().map(move |key| self.get(key))
    }
}

/// True if the reply carries the start marker, complete block or not.
pub fn mentions_lead(response: &str) -> bool {
    response.contains(LEAD_START)
}

/// Parse the first lead block in `response`. No block gives an empty record.
pub fn extract_lead(response: &str) -> LeadRecord {
    let Some(body) = LEAD_BLOCK.captures(response).and_then(|c| c.get(1)) else {
        return LeadRecord::default();
    };

    let fields = body
        .as_str()
        .trim()
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    LeadRecord { fields }
}

/// Remove every lead block, leaving the text around it.
pub fn strip_lead_blocks(response: &str) -> String {
    LEAD_BLOCK.replace_all(response, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "[LEAD_NOVO]\nNome: A\nCidade: B\nValor da Conta: 300\nPainel Solar: Não\nTelefone: 999\n[/LEAD_NOVO]";

    fn mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn extracts_the_five_fields() {
        let lead = extract_lead(BLOCK);

        assert_eq!(
            lead.fields(),
            &mapping(&[
                ("Nome", "A"),
                ("Cidade", "B"),
                ("Valor da Conta", "300"),
                ("Painel Solar", "Não"),
                ("Telefone", "999"),
            ])
        );
        assert_eq!(lead.values().collect::<Vec<_>>(), vec!["A", "B", "300", "Não", "999"]);
    }

    #[test]
    fn strip_keeps_text_around_the_block() {
        let response = format!("Perfeito!\n{}\nObrigado, entraremos em contato.", BLOCK);

        let visible = strip_lead_blocks(&response);
        assert_eq!(visible, "Perfeito!\n\nObrigado, entraremos em contato.");
        assert!(!visible.contains(LEAD_START));
        assert!(!visible.contains("Telefone"));
    }

    #[test]
    fn block_at_start_leaves_only_the_closing_text() {
        let response = format!("{}\n\nObrigado, Maria!", BLOCK);
        assert_eq!(strip_lead_blocks(&response), "Obrigado, Maria!");
        assert_eq!(extract_lead(&response).get("Nome"), "A");
    }

    #[test]
    fn no_block_gives_empty_record() {
        let response = "Qual é a sua cidade?";

        assert!(extract_lead(response).is_empty());
        assert!(!mentions_lead(response));
        assert_eq!(strip_lead_blocks(response), response);
    }

    #[test]
    fn unterminated_block_is_not_parsed() {
        let response = "[LEAD_NOVO]\nNome: A\nTelefone: 999";

        assert!(mentions_lead(response));
        assert!(extract_lead(response).is_empty());
    }

    #[test]
    fn lines_without_separator_are_ignored() {
        let lead = extract_lead("[LEAD_NOVO]\nDados do cliente\nNome:  Ana Souza \n\n[/LEAD_NOVO]");

        assert_eq!(lead.fields(), &mapping(&[("Nome", "Ana Souza")]));
    }

    #[test]
    fn value_is_split_at_first_separator_only() {
        let lead = extract_lead("[LEAD_NOVO]\nTelefone: +55 62: 99999-0000\n[/LEAD_NOVO]");

        assert_eq!(lead.get("Telefone"), "+55 62: 99999-0000");
    }

    #[test]
    fn missing_keys_read_as_empty() {
        let lead = extract_lead("[LEAD_NOVO]\nNome: A\n[/LEAD_NOVO]");

        assert_eq!(lead.get("Cidade"), "");
        assert_eq!(lead.values().collect::<Vec<_>>(), vec!["A", "", "", "", ""]);
    }

    #[test]
    fn inline_block_is_parsed() {
        let lead = extract_lead("ok [LEAD_NOVO]Nome: A[/LEAD_NOVO] fim");

        assert_eq!(lead.get("Nome"), "A");
        assert_eq!(strip_lead_blocks("ok [LEAD_NOVO]Nome: A[/LEAD_NOVO] fim"), "ok  fim");
    }
}
