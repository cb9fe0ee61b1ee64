//! Tenancy schedule extraction.
//!
//! A schedule sheet lists one lease per anchor row (a populated `Lease Code`
//! cell). Lease terms are stacked under `Expiry` on the rows below the
//! anchor, and the lease's charge lines start on the anchor row and continue
//! until a blank account/description pair or the report footer.

use crate::extract::coerce::coerce_numeric_or_text;
use crate::extract::coerce::money;
use crate::extract::coerce::strip;
use crate::extract::search::find_label_value;
use crate::extract::search::find_non_empty_rows;
use crate::extract::ExtractError;
use crate::extract::FieldValue;
use crate::extract::HeaderMap;
use crate::extract::SheetExtractor;
use crate::spreadsheet::CellValue;
use crate::spreadsheet::Grid;
use serde::Deserialize;
use tracing::debug;

/// How a scalar field is read from its cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FieldKind {
    Text,
    Numeric,
}

/// One tenancy column: where it sits relative to the anchor row.
#[derive(Copy, Clone, Debug)]
pub struct TenancyField {
    /// Output column name
    pub name: &'static str,
    /// Header key whose column holds the value
    pub header: &'static str,
    /// Rows below the anchor
    pub row_offset: usize,
    pub kind: FieldKind,
    /// Cleared when the lease code is the vacant sentinel
    pub lease_specific: bool,
}

const fn field(
    name: &'static str,
    header: &'static str,
    row_offset: usize,
    kind: FieldKind,
    lease_specific: bool,
) -> TenancyField {
    TenancyField {
        name,
        header,
        row_offset,
        kind,
        lease_specific,
    }
}

/// Scalar fields of a tenancy, in output order.
pub const TENANCY_FIELDS: [TenancyField; 11] = [
    field("unit", "Unit", 0, FieldKind::Text, false),
    field("lease_code", "Lease Code", 0, FieldKind::Text, false),
    field("tenant", "Tenant", 0, FieldKind::Text, false),
    field("lease_terms_start", "Start", 0, FieldKind::Text, true),
    field("lease_terms_expiry", "Expiry", 0, FieldKind::Text, true),
    field("lease_terms_term", "Expiry", 1, FieldKind::Text, true),
    field("lease_terms_option", "Expiry", 2, FieldKind::Text, true),
    field("lease_terms_nla", "NLA", 0, FieldKind::Numeric, true),
    field("rent_review_date", "Date", 0, FieldKind::Text, true),
    field("rent_review_description", "Rent Review Description", 0, FieldKind::Text, true),
    field("rent_review_type", "Type", 0, FieldKind::Text, true),
];

/// Column header of the charge table, in output order.
pub const CHARGE_COLUMNS: [&str; 9] = [
    "sheet",
    "property",
    "lease_code",
    "unit",
    "account",
    "description",
    "per_area",
    "monthly",
    "annual",
];

/// Labels and sentinels of a tenancy schedule export.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TenancyLayout {
    /// Header labels in their left-to-right order on the sheet
    pub labels: Vec<String>,
    /// Header whose column marks anchor rows
    pub key_label: String,
    pub vacant_sentinel: String,
    /// Text marking the end of the sheet's data
    pub footer_sentinel: String,
    pub footer_column: usize,
    /// Label whose right-hand neighbour names the property
    pub property_label: Option<String>,
    pub account_label: String,
    pub description_label: String,
    pub per_area_label: String,
    pub monthly_label: String,
    pub annual_label: String,
}

impl Default for TenancyLayout {
    fn default() -> Self {
        let labels = [
            "Unit", "Lease Code", "Tenant", "Start", "Expiry", "NLA", "Account", "Description", "Per Area",
            "Monthly", "Annual", "Date", "Description", "Type",
        ];
        TenancyLayout {
            labels: labels.iter().map(|label| label.to_string()).collect(),
            key_label: "Lease Code".to_owned(),
            vacant_sentinel: "Vacant".to_owned(),
            footer_sentinel: "cirrus8".to_owned(),
            footer_column: 0,
            property_label: Some("Property:".to_owned()),
            account_label: "Account".to_owned(),
            description_label: "Description".to_owned(),
            per_area_label: "Per Area".to_owned(),
            monthly_label: "Monthly".to_owned(),
            annual_label: "Annual".to_owned(),
        }
    }
}

/// One lease (or vacant unit) of a schedule sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct Tenancy {
    pub sheet: String,
    pub property: FieldValue,
    /// Values of [`TENANCY_FIELDS`], same order
    pub fields: Vec<FieldValue>,
}

impl Tenancy {
    pub fn get(&self, name: &str) -> &FieldValue {
        static EMPTY: FieldValue = FieldValue::Empty;
        TENANCY_FIELDS
            .iter()
            .position(|field| field.name == name)
            .and_then(|index| self.fields.get(index))
            .unwrap_or(&EMPTY)
    }
}

/// One charge line of a lease.
#[derive(Clone, Debug, PartialEq)]
pub struct Charge {
    pub sheet: String,
    pub property: FieldValue,
    pub lease_code: FieldValue,
    pub unit: FieldValue,
    pub account: FieldValue,
    pub description: FieldValue,
    pub per_area: FieldValue,
    pub monthly: FieldValue,
    pub annual: FieldValue,
}

impl Charge {
    /// Values in [`CHARGE_COLUMNS`] order.
    pub fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::from(self.sheet.as_str()),
            self.property.clone(),
            self.lease_code.clone(),
            self.unit.clone(),
            self.account.clone(),
            self.description.clone(),
            self.per_area.clone(),
            self.monthly.clone(),
            self.annual.clone(),
        ]
    }
}

/// Records of one schedule sheet, in anchor order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetTenancies {
    pub tenancies: Vec<Tenancy>,
    pub charges: Vec<Charge>,
}

/// Columns of the charge table, resolved for one sheet.
struct ChargeColumns {
    account: Option<usize>,
    description: Option<usize>,
    per_area: Option<usize>,
    monthly: Option<usize>,
    annual: Option<usize>,
}

pub struct TenancyExtractor {
    layout: TenancyLayout,
}

impl TenancyExtractor {
    pub fn new(layout: TenancyLayout) -> Self {
        TenancyExtractor { layout }
    }

    fn is_footer(&self, grid: &Grid, row: usize) -> bool {
        !self.layout.footer_sentinel.is_empty()
            && match grid.get(row, self.layout.footer_column) {
                CellValue::Absent => false,
                cell => cell.to_string().contains(&self.layout.footer_sentinel),
            }
    }

    /// Rows below the key header with a populated key cell, up to the footer.
    fn anchors(&self, grid: &Grid, key_row: usize, key_col: usize) -> Vec<usize> {
        let footer = (key_row + 1..grid.height())
            .find(|row| self.is_footer(grid, *row))
            .unwrap_or(grid.height());
        find_non_empty_rows(grid, key_col)
            .into_iter()
            .filter(|row| *row > key_row && *row < footer)
            .collect()
    }

    fn tenancy(&self, sheet_name: &str, property: &FieldValue, grid: &Grid, header: &HeaderMap, anchor: usize) -> Tenancy {
        let key = strip(cell_at(grid, anchor, header.column(&self.layout.key_label)));
        let vacant = key.as_text() == Some(self.layout.vacant_sentinel.as_str());
        let fields = TENANCY_FIELDS
            .iter()
            .map(|field| {
                if vacant && field.lease_specific {
                    return FieldValue::Empty;
                }
                let cell = cell_at(grid, anchor + field.row_offset, header.column(field.header));
                match field.kind {
                    FieldKind::Text => strip(cell),
                    FieldKind::Numeric => coerce_numeric_or_text(cell),
                }
            })
            .collect();
        Tenancy {
            sheet: sheet_name.to_owned(),
            property: property.clone(),
            fields,
        }
    }

    /// Walks charge lines from the anchor row until the footer, a blank
    /// account/description pair or `limit` (the next anchor).
    fn charges(&self, tenancy: &Tenancy, grid: &Grid, columns: &ChargeColumns, anchor: usize, limit: usize) -> Vec<Charge> {
        let mut charges = Vec::new();
        for row in anchor..limit {
            if self.is_footer(grid, row) {
                break;
            }
            let account = strip(cell_at(grid, row, columns.account));
            let description = strip(cell_at(grid, row, columns.description));
            match (account.is_empty(), description.is_empty()) {
                (true, true) => break,
                (false, false) => charges.push(Charge {
                    sheet: tenancy.sheet.clone(),
                    property: tenancy.property.clone(),
                    lease_code: tenancy.get("lease_code").clone(),
                    unit: tenancy.get("unit").clone(),
                    account,
                    description,
                    per_area: money(cell_at(grid, row, columns.per_area)),
                    monthly: money(cell_at(grid, row, columns.monthly)),
                    annual: money(cell_at(grid, row, columns.annual)),
                }),
                _ => (),
            }
        }
        charges
    }
}

impl SheetExtractor for TenancyExtractor {
    type Output = SheetTenancies;

    fn extract(&self, sheet_name: &str, grid: &Grid) -> Result<SheetTenancies, ExtractError> {
        let header = HeaderMap::locate(grid, &self.layout.labels);
        let (key_row, key_col) = header
            .get(&self.layout.key_label)
            .indexes()
            .ok_or_else(|| ExtractError::MissingHeader {
                label: self.layout.key_label.clone(),
            })?;
        let missing = header.missing();
        if !missing.is_empty() {
            debug!(sheet = sheet_name, ?missing, "Headers not found");
        }

        let property = match &self.layout.property_label {
            Some(label) => strip(&find_label_value(grid, label)),
            None => FieldValue::Empty,
        };
        let columns = ChargeColumns {
            account: header.column(&self.layout.account_label),
            description: header.column(&self.layout.description_label),
            per_area: header.column(&self.layout.per_area_label),
            monthly: header.column(&self.layout.monthly_label),
            annual: header.column(&self.layout.annual_label),
        };

        let anchors = self.anchors(grid, key_row, key_col);
        let mut records = SheetTenancies::default();
        for (index, anchor) in anchors.iter().enumerate() {
            let limit = anchors.get(index + 1).copied().unwrap_or(grid.height());
            let tenancy = self.tenancy(sheet_name, &property, grid, &header, *anchor);
            records.charges.extend(self.charges(&tenancy, grid, &columns, *anchor, limit));
            records.tenancies.push(tenancy);
        }
        debug!(
            sheet = sheet_name,
            tenancies = records.tenancies.len(),
            charges = records.charges.len(),
            "Extracted tenancy schedule"
        );
        Ok(records)
    }
}

static ABSENT: CellValue = CellValue::Absent;

/// Cell in a header's column; unmapped headers read as absent.
fn cell_at(grid: &Grid, row: usize, col: Option<usize>) -> &CellValue {
    col.map_or(&ABSENT, |col| grid.get(row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_owned())
    }

    fn schedule() -> Grid {
        Grid::from_text(&[
            &["Property:", "", "Harbour House", "", "", "", "", "", "", "", "", "", "", ""],
            &[
                "Unit", "Lease Code", "Tenant", "Start", "Expiry", "NLA", "Account", "Description", "Per Area",
                "Monthly", "Annual", "Date", "Description", "Type",
            ],
            &[
                "G01", "L100", "Acme Pty Ltd", "2023-01-01", "2028-12-31", "120", "4000", "Base Rent", "350.456",
                "3500", "42000", "2025-01-01", "Market", "CPI",
            ],
            &["", "", "", "", "5 years", "", "4010", "Outgoings", "", "800", "9600", "", "", ""],
            &["", "", "", "", "2 x 5 years", "", "", "", "", "", "", "", "", ""],
            &["G02", "Vacant", "", "", "2030-01-01", "80", "4000", "Marketing", "", "150", "1800", "", "", ""],
            &["Printed by cirrus8", "", "", "", "", "", "4100", "Parking", "", "90", "1080", "", "", ""],
        ])
    }

    fn extract(grid: &Grid) -> Result<SheetTenancies, ExtractError> {
        TenancyExtractor::new(TenancyLayout::default()).extract("Page 1", grid)
    }

    #[test]
    fn tenancy_fields_follow_row_offsets() {
        let records = extract(&schedule()).unwrap();
        let tenancy = &records.tenancies[0];
        assert_eq!(tenancy.sheet, "Page 1");
        assert_eq!(tenancy.property, text("Harbour House"));
        assert_eq!(tenancy.get("unit"), &text("G01"));
        assert_eq!(tenancy.get("lease_code"), &text("L100"));
        assert_eq!(tenancy.get("tenant"), &text("Acme Pty Ltd"));
        assert_eq!(tenancy.get("lease_terms_expiry"), &text("2028-12-31"));
        assert_eq!(tenancy.get("lease_terms_term"), &text("5 years"));
        assert_eq!(tenancy.get("lease_terms_option"), &text("2 x 5 years"));
        assert_eq!(tenancy.get("lease_terms_nla"), &FieldValue::Number(120.0));
        assert_eq!(tenancy.get("rent_review_date"), &text("2025-01-01"));
        assert_eq!(tenancy.get("rent_review_description"), &text("Market"));
        assert_eq!(tenancy.get("rent_review_type"), &text("CPI"));
    }

    #[test]
    fn vacant_unit_has_no_lease_terms() {
        let records = extract(&schedule()).unwrap();
        let vacant = &records.tenancies[1];
        assert_eq!(vacant.get("unit"), &text("G02"));
        assert_eq!(vacant.get("lease_code"), &text("Vacant"));
        for name in [
            "lease_terms_start",
            "lease_terms_expiry",
            "lease_terms_term",
            "lease_terms_option",
            "lease_terms_nla",
            "rent_review_date",
            "rent_review_description",
            "rent_review_type",
        ] {
            assert_eq!(vacant.get(name), &FieldValue::Empty, "{}", name);
        }
    }

    #[test]
    fn one_tenancy_per_anchor() {
        let grid = schedule();
        let records = extract(&grid).unwrap();
        let extractor = TenancyExtractor::new(TenancyLayout::default());
        assert_eq!(extractor.anchors(&grid, 1, 1), vec![2, 5]);
        assert_eq!(records.tenancies.len(), 2);
    }

    #[test]
    fn charges_stop_at_blank_pair() {
        let records = extract(&schedule()).unwrap();
        let descriptions: Vec<_> = records
            .charges
            .iter()
            .map(|charge| charge.description.to_string())
            .collect();
        assert_eq!(descriptions, vec!["Base Rent", "Outgoings", "Marketing"]);
        assert_eq!(records.charges[1].lease_code, text("L100"));
        assert_eq!(records.charges[2].unit, text("G02"));
    }

    #[test]
    fn footer_row_is_not_a_charge() {
        // row 6 has an account and a description but carries the footer
        let records = extract(&schedule()).unwrap();
        assert!(records.charges.iter().all(|charge| charge.description != text("Parking")));
    }

    #[test]
    fn charge_amounts_are_rounded_and_nulls_stay_empty() {
        let records = extract(&schedule()).unwrap();
        assert_eq!(records.charges[0].per_area, FieldValue::Number(350.46));
        assert_eq!(records.charges[0].annual, FieldValue::Number(42000.0));
        assert_eq!(records.charges[1].per_area, FieldValue::Empty);
        assert_eq!(records.charges[1].values()[6].to_string(), "");
    }

    #[test]
    fn partial_charge_line_is_skipped_not_terminal() {
        let grid = Grid::from_text(&[
            &["Unit", "Lease Code", "Account", "Description"],
            &["G01", "L1", "4000", "Base Rent"],
            &["", "", "", "Note only"],
            &["", "", "4010", "Outgoings"],
        ]);
        let records = extract(&grid).unwrap();
        assert_eq!(records.charges.len(), 2);
        assert_eq!(records.tenancies[0].property, FieldValue::Empty);
    }

    #[test]
    fn missing_key_header_fails_the_sheet() {
        let grid = Grid::from_text(&[&["Summary"], &["Total"]]);
        assert_eq!(
            extract(&grid),
            Err(ExtractError::MissingHeader {
                label: "Lease Code".to_owned()
            })
        );
    }
}
