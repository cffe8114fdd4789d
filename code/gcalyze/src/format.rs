/// Generic formatting code for a list of records, each presented through a set of named field
/// formatters: as fixed-width columns, as csv (with or without field names), or as a json array of
/// objects.  All fields are formatted as strings before output.
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::io;

pub struct Help {
    pub fields: Vec<String>,
    pub aliases: Vec<(String, Vec<String>)>,
    pub defaults: String,
}

/// If `fmt` asks for help, print the help text produced by `f` and return true.

pub fn maybe_help<F>(fmt: &Option<String>, f: F) -> bool
where
    F: Fn() -> Help,
{
    let Some(ref s) = fmt else {
        return false;
    };
    if !s.starts_with("help") {
        return false;
    }
    let mut help = f();
    println!("Syntax:\n  --fmt=(field|alias|control),...");
    println!("\nFields:");
    help.fields.sort();
    for f in help.fields {
        println!("  {f}");
    }
    if !help.aliases.is_empty() {
        println!("\nAliases:");
        help.aliases.sort();
        for (name, mut fields) in help.aliases {
            fields.sort();
            println!("  {name} --> {}", fields.join(","));
        }
    }
    println!("\nDefaults:\n  {}", help.defaults);
    println!("\nControl:\n  csv\n  csvnamed\n  fixed\n  json\n  header\n  noheader\n  tag:<tagvalue>");
    true
}

/// Return a vector of the known fields in `spec` wrt the formatters, and a HashSet of any other
/// strings found in `spec`.  It returns an error if zero output fields were selected.

pub fn parse_fields<'a, DataT, FmtT, CtxT>(
    spec: &'a str,
    formatters: &HashMap<String, FmtT>,
    aliases: &'a HashMap<String, Vec<String>>,
) -> Result<(Vec<&'a str>, HashSet<&'a str>)>
where
    FmtT: Fn(&DataT, CtxT) -> String,
    CtxT: Copy,
{
    let mut others = HashSet::new();
    let mut fields = vec![];
    for x in spec.split(',') {
        if formatters.contains_key(x) {
            fields.push(x);
        } else if let Some(expansion) = aliases.get(x) {
            for name in expansion {
                if formatters.contains_key(name) {
                    fields.push(name.as_str());
                } else {
                    others.insert(name.as_str());
                }
            }
        } else {
            others.insert(x);
        }
    }
    if fields.is_empty() {
        bail!("No output fields were selected")
    }
    Ok((fields, others))
}

#[derive(Debug, Default)]
pub struct FormatOptions {
    pub tag: Option<String>,
    pub json: bool,   // json explicitly requested
    pub csv: bool,    // csv or csvnamed explicitly requested
    pub fixed: bool,  // fixed output explicitly requested
    pub named: bool,  // csvnamed explicitly requested
    pub header: bool, // true if nothing requested b/c fixed+header is default
}

pub fn standard_options(others: &HashSet<&str>) -> FormatOptions {
    let csvnamed = others.contains("csvnamed");
    let csv = others.contains("csv") || csvnamed;
    let json = others.contains("json") && !csv;
    let fixed = others.contains("fixed") && !csv && !json;
    // json gets no header, even if one is requested
    let header =
        (!csv && !json && !others.contains("noheader")) || (csv && others.contains("header"));
    let tag = others
        .iter()
        .find_map(|x| x.strip_prefix("tag:"))
        .map(|t| t.to_string());
    FormatOptions {
        tag,
        json,
        csv,
        fixed,
        named: csvnamed,
        header,
    }
}

/// The `fields` are the names of formatting functions to get from the `formatters`, these are
/// applied to the `data`.  Set `opts.header` to true to print a first row with field names as a
/// header (independent of csv).  Set `opts.csv` to true to get CSV output instead of fixed-format,
/// or `opts.json` for JSON.  Set `opts.tag` to Some(s) to print a tag=s field in the output.
///
/// Write errors are returned, except for fixed-format output where they are ignored since they are
/// common for broken pipelines.

pub fn format_data<'a, DataT, FmtT, CtxT>(
    output: &mut dyn io::Write,
    fields: &[&'a str],
    formatters: &HashMap<String, FmtT>,
    opts: &FormatOptions,
    data: Vec<DataT>,
    ctx: CtxT,
) -> Result<()>
where
    FmtT: Fn(&DataT, CtxT) -> String,
    CtxT: Copy,
{
    let mut fmts = vec![];
    for kwd in fields {
        let Some(f) = formatters.get(*kwd) else {
            bail!("Unknown field {kwd}")
        };
        fmts.push(f);
    }
    let rows = data
        .iter()
        .map(|x| fmts.iter().map(|f| f(x, ctx)).collect::<Vec<String>>())
        .collect::<Vec<Vec<String>>>();

    if opts.csv {
        format_csv(output, fields, opts, rows)
    } else if opts.json {
        format_json(output, fields, opts, rows)
    } else {
        format_fixed_width(output, fields, opts, rows);
        Ok(())
    }
}

fn format_fixed_width(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    rows: Vec<Vec<String>>,
) {
    // The column width is the max across all the entries in the column (including header, if
    // present).  If there's a tag, it is printed in the last column.
    let mut header = fields.iter().map(|f| f.to_string()).collect::<Vec<String>>();
    if opts.tag.is_some() {
        header.push("tag".to_string());
    }
    let mut widths = vec![0; header.len()];
    if opts.header {
        for (w, h) in widths.iter_mut().zip(header.iter()) {
            *w = h.len();
        }
    }
    for row in &rows {
        for (w, v) in widths.iter_mut().zip(row.iter()) {
            *w = usize::max(*w, v.len());
        }
        if let Some(ref tag) = opts.tag {
            let last = widths.len() - 1;
            widths[last] = usize::max(widths[last], tag.len());
        }
    }

    if opts.header {
        write_fixed_row(output, &widths, header.iter().map(|h| h.as_str()));
    }
    for row in &rows {
        write_fixed_row(
            output,
            &widths,
            row.iter().map(|v| v.as_str()).chain(opts.tag.as_deref()),
        );
    }
}

fn write_fixed_row<'a>(
    output: &mut dyn io::Write,
    widths: &[usize],
    vals: impl Iterator<Item = &'a str>,
) {
    let mut s = "".to_string();
    for (v, w) in vals.zip(widths.iter()) {
        let w = *w;
        s += format!("{:w$}  ", v).as_str();
    }
    // Ignore errors here, they are common for broken pipelines
    let _ = output.write_all(s.trim_end().as_bytes());
    let _ = output.write_all(b"\n");
}

fn format_csv(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    rows: Vec<Vec<String>>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(output);

    if opts.header {
        let mut out_fields = fields.iter().map(|f| f.to_string()).collect::<Vec<String>>();
        if opts.tag.is_some() {
            out_fields.push("tag".to_string());
        }
        writer.write_record(out_fields)?;
    }

    for row in rows {
        let mut out_fields = if opts.named {
            fields
                .iter()
                .zip(row)
                .map(|(f, v)| format!("{f}={v}"))
                .collect::<Vec<String>>()
        } else {
            row
        };
        if let Some(ref tag) = opts.tag {
            if opts.named {
                out_fields.push(format!("tag={tag}"));
            } else {
                out_fields.push(tag.clone());
            }
        }
        writer.write_record(out_fields)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_json(
    output: &mut dyn io::Write,
    fields: &[&str],
    opts: &FormatOptions,
    rows: Vec<Vec<String>>,
) -> Result<()> {
    let objects = rows
        .into_iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (f, v) in fields.iter().zip(row) {
                obj.insert(f.to_string(), serde_json::Value::String(v));
            }
            if let Some(ref tag) = opts.tag {
                obj.insert("tag".to_string(), serde_json::Value::String(tag.clone()));
            }
            serde_json::Value::Object(obj)
        })
        .collect::<Vec<serde_json::Value>>();
    serde_json::to_writer(&mut *output, &objects)?;
    output.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
struct Row {
    name: &'static str,
    n: u32,
}

#[cfg(test)]
fn test_formatters() -> HashMap<String, &'static dyn Fn(&Row, &bool) -> String> {
    let mut formatters: HashMap<String, &'static dyn Fn(&Row, &bool) -> String> = HashMap::new();
    formatters.insert("name".to_string(), &test_format_name);
    formatters.insert("n".to_string(), &test_format_n);
    formatters
}

#[cfg(test)]
fn test_format_name(d: &Row, _: &bool) -> String {
    d.name.to_string()
}

#[cfg(test)]
fn test_format_n(d: &Row, _: &bool) -> String {
    d.n.to_string()
}

#[cfg(test)]
fn test_rows() -> Vec<Row> {
    vec![Row { name: "Young", n: 12 }, Row { name: "Remark", n: 3 }]
}

#[cfg(test)]
fn render(spec: &str) -> String {
    let formatters = test_formatters();
    let mut aliases = HashMap::new();
    aliases.insert("all".to_string(), vec!["name".to_string(), "n".to_string()]);
    let (fields, others) = parse_fields(spec, &formatters, &aliases).unwrap();
    let opts = standard_options(&others);
    let mut out = Vec::new();
    format_data(&mut out, &fields, &formatters, &opts, test_rows(), &false).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_parse_fields() {
    let formatters = test_formatters();
    let mut aliases = HashMap::new();
    aliases.insert("all".to_string(), vec!["name".to_string(), "n".to_string()]);
    let (fields, others) = parse_fields("all,csv,tag:x", &formatters, &aliases).unwrap();
    assert!(fields == vec!["name", "n"]);
    assert!(others.contains("csv") && others.contains("tag:x"));
    assert!(parse_fields("csv,header", &formatters, &aliases).is_err());
}

#[test]
fn test_standard_options() {
    let opts = standard_options(&HashSet::from(["csvnamed", "json"]));
    assert!(opts.csv && opts.named && !opts.json && !opts.header);
    let opts = standard_options(&HashSet::new());
    assert!(!opts.csv && !opts.json && opts.header);
    let opts = standard_options(&HashSet::from(["json", "header"]));
    assert!(opts.json && !opts.header);
}

#[test]
fn test_format_fixed() {
    assert!(render("name,n") == "name    n\nYoung   12\nRemark  3\n");
    assert!(render("n,noheader") == "12\n3\n");
}

#[test]
fn test_format_csv() {
    assert!(render("all,csv") == "Young,12\nRemark,3\n");
    assert!(render("all,csv,header") == "name,n\nYoung,12\nRemark,3\n");
    assert!(render("n,csvnamed,tag:run1") == "n=12,tag=run1\nn=3,tag=run1\n");
}

#[test]
fn test_format_json() {
    let v: serde_json::Value = serde_json::from_str(&render("all,json")).unwrap();
    assert!(v[0]["name"] == "Young");
    assert!(v[1]["n"] == "3");
}
