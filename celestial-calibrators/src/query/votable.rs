//! Minimal VOTable (TABLEDATA serialization) reader.
//!
//! Both VizieR and the SIMBAD TAP service answer in VOTable. Only what the
//! pipeline needs is decoded: the FIELD list of the first TABLE, its rows,
//! and the `QUERY_STATUS` INFO element that signals a server-side failure.

use crate::errors::{CalibError, CalibResult};
use crate::model::{Row, Value};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Column metadata from a `<FIELD>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub datatype: String,
    pub unit: Option<String>,
}

impl Field {
    fn is_numeric(&self) -> bool {
        matches!(
            self.datatype.as_str(),
            "double" | "float" | "int" | "short" | "long" | "unsignedByte"
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoTable {
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
}

impl VoTable {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Parse a VOTable document.
///
/// # Errors
/// Returns [`CalibError::Parse`] for malformed XML, BINARY/FITS serializations,
/// or an `INFO name="QUERY_STATUS" value="ERROR"` element.
pub fn parse_votable(xml: &str) -> CalibResult<VoTable> {
    let mut reader = Reader::from_str(xml);

    let mut table = VoTable::default();
    let mut tables_seen = 0usize;
    let mut in_first_table = false;

    let mut in_td = false;
    let mut cell = String::new();
    let mut cells: Vec<Option<String>> = Vec::new();

    let mut status_error: Option<String> = None;
    let mut in_status_error = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"TABLE" => {
                    tables_seen += 1;
                    in_first_table = tables_seen == 1;
                }
                b"FIELD" if in_first_table => table.fields.push(parse_field(&e)?),
                b"TR" if in_first_table => cells.clear(),
                b"TD" if in_first_table => {
                    in_td = true;
                    cell.clear();
                }
                b"BINARY" | b"BINARY2" | b"FITS" if in_first_table => {
                    return Err(CalibError::parse(
                        "VOTable",
                        "only TABLEDATA serialization is supported",
                    ));
                }
                b"INFO" => {
                    if let Some(message) = query_status_error(&e)? {
                        status_error = Some(message);
                        in_status_error = true;
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"FIELD" if in_first_table => table.fields.push(parse_field(&e)?),
                b"TD" if in_first_table => cells.push(None),
                b"INFO" => {
                    if let Some(message) = query_status_error(&e)? {
                        status_error = Some(message);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| CalibError::parse("VOTable", err.to_string()))?;
                if in_td {
                    cell.push_str(&text);
                } else if in_status_error {
                    let text = text.trim();
                    if !text.is_empty() {
                        status_error = Some(text.to_string());
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_td {
                    cell.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"TABLE" => in_first_table = false,
                b"TD" if in_td => {
                    in_td = false;
                    let trimmed = cell.trim();
                    cells.push((!trimmed.is_empty()).then(|| trimmed.to_string()));
                }
                b"TR" if in_first_table => table.rows.push(build_row(&table.fields, &cells)),
                b"INFO" => in_status_error = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(CalibError::parse("VOTable", e.to_string())),
            _ => {}
        }
    }

    if let Some(message) = status_error {
        return Err(CalibError::parse(
            "VOTable",
            format!("service reported error: {}", message),
        ));
    }
    Ok(table)
}

fn parse_field(e: &BytesStart<'_>) -> CalibResult<Field> {
    let mut name = None;
    let mut datatype = String::from("char");
    let mut unit = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| CalibError::parse("VOTable FIELD", err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| CalibError::parse("VOTable FIELD", err.to_string()))?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(value),
            b"datatype" => datatype = value,
            b"unit" => unit = Some(value),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| CalibError::parse("VOTable FIELD", "missing name attribute"))?;
    Ok(Field {
        name,
        datatype,
        unit,
    })
}

/// Returns the error message if `e` is a `QUERY_STATUS` INFO with value `ERROR`.
fn query_status_error(e: &BytesStart<'_>) -> CalibResult<Option<String>> {
    let mut is_status = false;
    let mut is_error = false;
    let mut message = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| CalibError::parse("VOTable INFO", err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| CalibError::parse("VOTable INFO", err.to_string()))?;
        match attr.key.local_name().as_ref() {
            b"name" => is_status = value == "QUERY_STATUS",
            b"value" => is_error = value.eq_ignore_ascii_case("ERROR"),
            b"content" => message = Some(value.into_owned()),
            _ => {}
        }
    }

    if is_status && is_error {
        Ok(Some(message.unwrap_or_else(|| "unspecified error".to_string())))
    } else {
        Ok(None)
    }
}

fn build_row(fields: &[Field], cells: &[Option<String>]) -> Row {
    let mut row = Row::new();
    for (field, cell) in fields.iter().zip(cells) {
        let value = match cell {
            None => Value::Null,
            Some(text) if field.is_numeric() => match text.parse::<f64>() {
                Ok(v) => Value::Number(v),
                Err(_) => Value::Null,
            },
            Some(text) => Value::Text(text.clone()),
        };
        row.insert(field.name.clone(), value);
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSDC_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<VOTABLE version="1.4" xmlns="http://www.ivoa.net/xml/VOTable/v1.3">
<RESOURCE ID="yCat_2346" name="II/346">
<INFO name="QUERY_STATUS" value="OK"/>
<TABLE ID="II_346_jsdc_v2" name="II/346/jsdc_v2">
<FIELD name="_r" ucd="pos.angDistance" datatype="double" unit="arcsec"/>
<FIELD name="Name" ucd="meta.id" datatype="char" arraysize="*"/>
<FIELD name="Vmag" ucd="phot.mag;em.opt.V" datatype="double" unit="mag"/>
<FIELD name="Hmag" datatype="double" unit="mag"/>
<FIELD name="UDDH" datatype="float" unit="mas">
  <DESCRIPTION>H-band uniform disk diameter</DESCRIPTION>
</FIELD>
<DATA><TABLEDATA>
<TR><TD>0.12</TD><TD>HD  1234</TD><TD>6.82</TD><TD>5.87</TD><TD>0.270</TD></TR>
<TR><TD>3.5</TD><TD>TYC 1-2-3</TD><TD>8.10</TD><TD></TD><TD/></TR>
</TABLEDATA></DATA>
</TABLE>
<TABLE ID="second">
<FIELD name="Other" datatype="int"/>
<DATA><TABLEDATA><TR><TD>1</TD></TR></TABLEDATA></DATA>
</TABLE>
</RESOURCE>
</VOTABLE>"#;

    #[test]
    fn test_parses_fields_and_rows_of_first_table() {
        let table = parse_votable(JSDC_SAMPLE).unwrap();
        assert_eq!(table.fields.len(), 5);
        assert_eq!(table.field("_r").unwrap().unit.as_deref(), Some("arcsec"));
        assert_eq!(table.rows.len(), 2);

        let first = &table.rows[0];
        assert_eq!(first.number("Vmag"), Some(6.82));
        assert_eq!(first.number("UDDH"), Some(0.270));
        assert_eq!(first.text("Name"), Some("HD  1234"));
        assert!(first.get("Other").is_none());
    }

    #[test]
    fn test_empty_cells_are_null() {
        let table = parse_votable(JSDC_SAMPLE).unwrap();
        let second = &table.rows[1];
        assert_eq!(second.get("Hmag"), Some(&Value::Null));
        assert_eq!(second.get("UDDH"), Some(&Value::Null));
        assert_eq!(second.number("Hmag"), None);
    }

    #[test]
    fn test_no_table_yields_empty_result() {
        let xml = r#"<VOTABLE><RESOURCE><INFO name="QUERY_STATUS" value="OK"/></RESOURCE></VOTABLE>"#;
        let table = parse_votable(xml).unwrap();
        assert!(table.fields.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_query_status_error_is_reported() {
        let xml = r#"<VOTABLE><RESOURCE>
<INFO name="QUERY_STATUS" value="ERROR">Unknown catalogue XYZ</INFO>
</RESOURCE></VOTABLE>"#;
        let err = parse_votable(xml).unwrap_err();
        assert!(err.to_string().contains("Unknown catalogue XYZ"));
    }

    #[test]
    fn test_binary_serialization_rejected() {
        let xml = r#"<VOTABLE><RESOURCE><TABLE><FIELD name="a" datatype="int"/>
<DATA><BINARY><STREAM encoding="base64">AAAA</STREAM></BINARY></DATA></TABLE></RESOURCE></VOTABLE>"#;
        assert!(parse_votable(xml).is_err());
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = parse_votable("<VOTABLE><RESOURCE></VOTABLE>").unwrap_err();
        assert!(matches!(err, CalibError::Parse { .. }));
    }
}
