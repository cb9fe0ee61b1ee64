use crate::error::IngestError;
use crate::error::ResultMessage;
use crate::helpers::reference::index_to_reference;
use crate::helpers::reference::is_within_sheet;
use crate::helpers::reference::reference_to_index;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Grid;
use crate::spreadsheet::SpreadsheetError;
use crate::spreadsheet::Workbook;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for the parts of an XLSX package
const TAG_RELATIONSHIP: &[u8] = b"Relationship";      // Entry of a .rels part
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");  // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");    // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic run, not part of the value
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

/// First bytes of an OLE compound file
const COMPOUND_FILE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

type Archive = ZipArchive<Cursor<Vec<u8>>>;

/// An XLSX workbook held in memory
pub struct XlsxWorkbook {
    name: String,
    zip: Archive,
    /// Cell type per style index, used to recognise date cells
    number_formats: Vec<CellType>,
    shared_strings: Vec<String>,
    /// Worksheets as (name, zip path), in workbook order
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook {
    /// Opens a workbook from its raw bytes.
    ///
    /// Fails when the bytes are not a zip package, when the package lacks
    /// `xl/workbook.xml`, or when it lists no worksheets.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<XlsxWorkbook, IngestError> {
        if bytes.starts_with(&COMPOUND_FILE_MAGIC) {
            Err(SpreadsheetError::CompoundFile(name.to_owned()))?;
        }
        let mut zip = Archive::new(Cursor::new(bytes))
            .map_err(IngestError::from)
            .with_prefix(name)?;
        let (sheets, is_1904) = load_workbook(name, &mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(name.to_owned()))?;
        }
        let number_formats = load_number_formats(&mut zip, is_1904)?;
        let shared_strings = load_shared_strings(&mut zip)?;
        debug!(
            workbook = name,
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            "Opened workbook"
        );
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            shared_strings,
            sheets,
        })
    }
}

impl Workbook for XlsxWorkbook {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    fn read_grid(&mut self, sheet_name: &str, criteria: &Criteria) -> Result<Grid, IngestError> {
        let zip_path = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound(sheet_name.to_owned()))?;
        let mut reader = self
            .zip
            .xml_reader(&zip_path)?
            .ok_or_else(|| SpreadsheetError::MissingPart(self.name.to_owned(), zip_path.to_owned()))?;

        let mut cells = Vec::new();
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                // Rows may declare their 1-based index; fall back to counting
                row_count = event
                    .attribute("r")?
                    .and_then(|r| r.parse::<usize>().ok())
                    .and_then(|r| r.checked_sub(1))
                    .unwrap_or(row_count);
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event
                    .attribute("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                if !is_within_sheet(row, col) {
                    Err(SpreadsheetError::CellOutOfRange(index_to_reference(row, col)))?;
                }
                col_count = col + 1;
                value.clear();
                kind = match event.attribute("t")?.as_deref() {
                    Some("inlineStr") | Some("str") => CellType::InlineString,
                    Some("s") => CellType::SharedString,
                    Some("d") => CellType::IsoDateTime,
                    Some("b") => CellType::Boolean,
                    Some("e") => CellType::Error,
                    _ => CellType::Number,
                };
                if kind == CellType::Number {
                    if let Some(style) = event.attribute("s")? {
                        if !style.is_empty() {
                            let index = style.parse::<usize>()?;
                            kind = self.number_formats.get(index).copied().unwrap_or(CellType::Number);
                        }
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    let cell = Cell { row, col, kind, value: std::mem::take(&mut value) };
                    let decoded = cell.decode(&self.shared_strings, &criteria.nulls)?;
                    if !decoded.is_absent() {
                        cells.push((row, col, decoded));
                    }
                }
            }
        });

        debug!(sheet = sheet_name, cells = cells.len(), "Read worksheet");
        Ok(Grid::from_cells(cells, criteria.max_cells)?)
    }
}

/// Loads the worksheet list and the date system from `xl/workbook.xml`.
fn load_workbook(name: &str, zip: &mut Archive) -> Result<(Vec<(String, String)>, bool), IngestError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::MissingPart(name.to_owned(), "xl/workbook.xml".to_owned()))?;
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let sheet_name = event.attribute("name")?.map(|value| value.to_string());
            let id = event.local_attribute("id")?.map(|value| value.to_string());
            if let Some((sheet_name, id)) = sheet_name.zip(id) {
                match relationships.get(&id) {
                    Some(path) => sheets.push((sheet_name, path.to_owned())),
                    None => debug!(sheet = %sheet_name, id = %id, "Sheet has no worksheet relationship"),
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .attribute("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Maps relationship ids to worksheet zip paths.
fn load_relationships(zip: &mut Archive, path: &str) -> Result<HashMap<String, String>, IngestError> {
    let mut relationships = HashMap::new();
    let Some(mut reader) = zip.xml_reader(path)? else {
        return Ok(relationships);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.attribute("Id")?.map(|value| value.to_string());
            let kind = event.attribute("Type")?.map(|value| value.to_string());
            let target = event.attribute("Target")?.map(|value| value.to_string());
            if kind.map(|kind| kind.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id, to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the `xl/` folder.
fn to_zip_path(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// Builds the style index -> cell type table from `xl/styles.xml`.
fn load_number_formats(zip: &mut Archive, is_1904: bool) -> Result<Vec<CellType>, IngestError> {
    let Some(mut reader) = zip.xml_reader("xl/styles.xml")? else {
        return Ok(Vec::new());
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.attribute("numFmtId")?.map(|value| value.to_string());
            let code = event.attribute("formatCode")?.map(|value| value.to_string());
            if let Some((id, code)) = id.zip(code) {
                custom_formats.insert(id, CellType::parse_custom_number_format(&code, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.attribute("numFmtId")?.map(|value| value.to_string());
            format_indexes.push(id.unwrap_or_default());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads every entry of the shared string table; a missing part yields an empty table.
fn load_shared_strings(zip: &mut Archive) -> Result<Vec<String>, IngestError> {
    let mut shared_strings = Vec::new();
    let Some(mut reader) = zip.xml_reader("xl/sharedStrings.xml")? else {
        return Ok(shared_strings);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads the text of an element up to `end_tag`.
///
/// Rich text runs are concatenated and phonetic runs skipped. With
/// `is_text_content` the element's own text counts (`<v>`); otherwise only
/// text inside `<t>` children does (`<si>`, `<is>`).
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, IngestError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    while let Some(event) = reader.next()? {
        match event {
            Event::End(event) if event.name() == end_tag => break,
            Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
            Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
            Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
            Event::End(event) if event.name() == TAG_TEXT => is_text = is_text_content,
            Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if is_text => text.push_reference(&event)?,
            _ => (),
        }
    }
    Ok(text)
}

/// Builds small XLSX packages in memory for tests.
#[cfg(test)]
pub(crate) mod fixture {
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// A fixture cell: text is written as an inline string, numbers as values,
    /// dates as numbers with the built-in `14` date style.
    pub(crate) enum Value<'a> {
        Text(&'a str),
        Number(f64),
        Date(f64),
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    fn sheet_xml(rows: &[Vec<Value>]) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);
        for (row, values) in rows.iter().enumerate() {
            xml.push_str(&format!(r#"<row r="{}">"#, row + 1));
            for (col, value) in values.iter().enumerate() {
                let reference = super::index_to_reference(row, col);
                match value {
                    Value::Text("") => (),
                    Value::Text(text) => xml.push_str(&format!(
                        r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape(text)
                    )),
                    Value::Number(number) => xml.push_str(&format!(r#"<c r="{reference}"><v>{number}</v></c>"#)),
                    Value::Date(serial) => xml.push_str(&format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#)),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        xml
    }

    /// Text-only rows; empty strings leave the cell out.
    pub(crate) fn text_rows(rows: &[&[&'static str]]) -> Vec<Vec<Value<'static>>> {
        rows.iter()
            .map(|row| row.iter().map(|text| Value::Text(*text)).collect())
            .collect()
    }

    pub(crate) fn build(sheets: &[(&str, Vec<Vec<Value>>)]) -> Vec<u8> {
        let sheets: Vec<(&str, String)> = sheets.iter().map(|(name, rows)| (*name, sheet_xml(rows))).collect();
        build_xml(&sheets)
    }

    /// Builds a package from raw worksheet XML.
    pub(crate) fn build_xml(sheets: &[(&str, String)]) -> Vec<u8> {
        let options = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut workbook = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><sheets>"#);
        let mut rels = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
        for (index, (name, xml)) in sheets.iter().enumerate() {
            let id = index + 1;
            workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#, escape(name)));
            rels.push_str(&format!(r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#));
            writer.start_file(format!("xl/worksheets/sheet{id}.xml"), options).unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        workbook.push_str("</sheets></workbook>");
        rels.push_str(r#"<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#);

        writer.start_file("xl/workbook.xml", options).unwrap();
        writer.write_all(workbook.as_bytes()).unwrap();
        writer.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        writer.write_all(rels.as_bytes()).unwrap();
        writer.start_file("xl/styles.xml", options).unwrap();
        writer
            .write_all(br#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#)
            .unwrap();
        writer.finish().unwrap().into_inner()
    }
}
