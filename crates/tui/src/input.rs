use chrono::NaiveDate;
use holdings_core::models::{Brokerage, Credentials, HoldingDraft};

const MAX_FIELD_LEN: usize = 128;

/// Single-line text field with a byte cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
    masked: bool,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.len();
        Self {
            value,
            cursor,
            masked: false,
        }
    }

    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.len())
        } else {
            self.value.clone()
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.value.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len);
        self.cursor = next as usize;
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.value.len();
    }

    pub fn insert(&mut self, ch: char) {
        if self.value.len() >= MAX_FIELD_LEN {
            return;
        }
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.value.insert(self.cursor, ch);
            self.cursor += ch.len_utf8();
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.value.len() {
            self.cursor -= 1;
            self.value.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.len() {
            self.value.remove(self.cursor);
        }
    }
}

/// Email/password form shared by the login and register screens.
#[derive(Debug, Clone)]
pub struct AuthForm {
    pub email: TextInput,
    pub password: TextInput,
    pub focus_password: bool,
    pub pending: bool,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            email: TextInput::default(),
            password: TextInput::masked(),
            focus_password: false,
            pending: false,
        }
    }
}

impl AuthForm {
    pub fn focused(&mut self) -> &mut TextInput {
        if self.focus_password {
            &mut self.password
        } else {
            &mut self.email
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus_password = !self.focus_password;
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.value(), self.password.value())
    }

    /// Forget the password, keeping the email for the next attempt.
    pub fn clear_secret(&mut self) {
        self.password.clear();
        self.focus_password = false;
    }
}

/// Fields of the holding dialog, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingField {
    Symbol,
    Quantity,
    CostBasis,
    PurchaseDate,
    Brokerage,
    Note,
}

impl HoldingField {
    pub const ALL: [HoldingField; 6] = [
        HoldingField::Symbol,
        HoldingField::Quantity,
        HoldingField::CostBasis,
        HoldingField::PurchaseDate,
        HoldingField::Brokerage,
        HoldingField::Note,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            HoldingField::Symbol => "Symbol",
            HoldingField::Quantity => "Quantity",
            HoldingField::CostBasis => "Cost basis",
            HoldingField::PurchaseDate => "Purchase date",
            HoldingField::Brokerage => "Brokerage",
            HoldingField::Note => "Note",
        }
    }
}

/// Text view over a [`HoldingDraft`]. Keystrokes land here and are parsed
/// back into the draft when the user saves.
#[derive(Debug, Clone)]
pub struct HoldingForm {
    symbol: TextInput,
    quantity: TextInput,
    cost_basis: TextInput,
    purchase_date: TextInput,
    note: TextInput,
    brokerage_id: Option<i64>,
    focus: usize,
}

impl HoldingForm {
    pub fn from_draft(draft: &HoldingDraft) -> Self {
        Self {
            symbol: TextInput::new(draft.symbol.clone()),
            quantity: TextInput::new(format_number(draft.quantity)),
            cost_basis: TextInput::new(format_number(draft.cost_basis)),
            purchase_date: TextInput::new(draft.purchase_date.format("%Y-%m-%d").to_string()),
            note: TextInput::new(draft.note.clone()),
            brokerage_id: draft.brokerage_id,
            focus: 0,
        }
    }

    pub fn focus(&self) -> HoldingField {
        HoldingField::ALL[self.focus]
    }

    pub fn move_focus(&mut self, delta: isize) {
        let len = HoldingField::ALL.len() as isize;
        self.focus = (self.focus as isize + delta).rem_euclid(len) as usize;
    }

    /// Text input behind `field`; the brokerage field is a picker instead.
    pub fn input(&self, field: HoldingField) -> Option<&TextInput> {
        match field {
            HoldingField::Symbol => Some(&self.symbol),
            HoldingField::Quantity => Some(&self.quantity),
            HoldingField::CostBasis => Some(&self.cost_basis),
            HoldingField::PurchaseDate => Some(&self.purchase_date),
            HoldingField::Note => Some(&self.note),
            HoldingField::Brokerage => None,
        }
    }

    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus() {
            HoldingField::Symbol => Some(&mut self.symbol),
            HoldingField::Quantity => Some(&mut self.quantity),
            HoldingField::CostBasis => Some(&mut self.cost_basis),
            HoldingField::PurchaseDate => Some(&mut self.purchase_date),
            HoldingField::Note => Some(&mut self.note),
            HoldingField::Brokerage => None,
        }
    }

    pub fn brokerage_id(&self) -> Option<i64> {
        self.brokerage_id
    }

    /// Step through "none" followed by every known brokerage.
    pub fn cycle_brokerage(&mut self, brokerages: &[Brokerage], delta: isize) {
        if brokerages.is_empty() {
            self.brokerage_id = None;
            return;
        }
        let slots = brokerages.len() as isize + 1;
        let current = self
            .brokerage_id
            .and_then(|id| brokerages.iter().position(|b| b.id == id))
            .map(|index| index as isize + 1)
            .unwrap_or(0);
        let next = (current + delta).rem_euclid(slots);
        self.brokerage_id = match next {
            0 => None,
            slot => Some(brokerages[slot as usize - 1].id),
        };
    }

    /// Parse the fields into `draft`. The symbol is copied verbatim so the
    /// draft's own validation decides whether it may be sent.
    pub fn write_to(&self, draft: &mut HoldingDraft) -> Result<(), String> {
        let quantity = parse_number(HoldingField::Quantity, self.quantity.value())?;
        let cost_basis = parse_number(HoldingField::CostBasis, self.cost_basis.value())?;
        let purchase_date =
            NaiveDate::parse_from_str(self.purchase_date.value().trim(), "%Y-%m-%d")
                .map_err(|_| "Purchase date must be YYYY-MM-DD".to_string())?;

        draft.symbol = self.symbol.value().to_string();
        draft.quantity = quantity;
        draft.cost_basis = cost_basis;
        draft.purchase_date = purchase_date;
        draft.brokerage_id = self.brokerage_id;
        draft.note = self.note.value().to_string();
        Ok(())
    }
}

fn parse_number(field: HoldingField, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("{} must be a number", field.label()))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
    }

    fn brokerages() -> Vec<Brokerage> {
        vec![
            Brokerage {
                id: 3,
                name: "Fubon".to_string(),
            },
            Brokerage {
                id: 8,
                name: "Cathay".to_string(),
            },
        ]
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::new("AAL");
        input.move_cursor(-1);
        input.insert('P');
        assert_eq!(input.value(), "AAPL");
        input.move_end();
        input.backspace();
        input.move_home();
        input.delete();
        assert_eq!(input.value(), "AP");
        input.move_cursor(-10);
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn masked_input_hides_value() {
        let mut input = TextInput::masked();
        "secret".chars().for_each(|ch| input.insert(ch));
        assert_eq!(input.display(), "******");
        assert_eq!(input.value(), "secret");
    }

    #[test]
    fn form_round_trips_draft_fields() {
        let mut draft = HoldingDraft::empty(today());
        draft.symbol = "2330".to_string();
        draft.quantity = 1000.0;
        draft.cost_basis = 585.5;
        draft.brokerage_id = Some(8);

        let form = HoldingForm::from_draft(&draft);
        assert_eq!(form.input(HoldingField::Quantity).map(|i| i.value()), Some("1000"));
        assert_eq!(form.input(HoldingField::CostBasis).map(|i| i.value()), Some("585.5"));

        let mut copy = HoldingDraft::empty(today());
        form.write_to(&mut copy).expect("fields parse");
        assert_eq!(copy, draft);
    }

    #[test]
    fn unparsable_number_leaves_draft_untouched() {
        let mut form = HoldingForm::from_draft(&HoldingDraft::empty(today()));
        form.move_focus(1);
        let quantity = form.focused_input().expect("quantity is text");
        quantity.clear();
        quantity.insert('x');

        let mut draft = HoldingDraft::empty(today());
        draft.symbol = "keep".to_string();
        let err = form.write_to(&mut draft).expect_err("quantity is not a number");
        assert_eq!(err, "Quantity must be a number");
        assert_eq!(draft.symbol, "keep");
    }

    #[test]
    fn brokerage_picker_wraps_through_none() {
        let mut form = HoldingForm::from_draft(&HoldingDraft::empty(today()));
        form.cycle_brokerage(&brokerages(), 1);
        assert_eq!(form.brokerage_id(), Some(3));
        form.cycle_brokerage(&brokerages(), 1);
        assert_eq!(form.brokerage_id(), Some(8));
        form.cycle_brokerage(&brokerages(), 1);
        assert_eq!(form.brokerage_id(), None);
        form.cycle_brokerage(&brokerages(), -1);
        assert_eq!(form.brokerage_id(), Some(8));
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut form = HoldingForm::from_draft(&HoldingDraft::empty(today()));
        form.move_focus(-1);
        assert_eq!(form.focus(), HoldingField::Note);
        form.move_focus(2);
        assert_eq!(form.focus(), HoldingField::Quantity);
    }
}
