use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::models::holding::HoldingEntry;

static PAGE_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"L=(\d+)").expect("valid regex"));

/// Parses one page of the aggregated-portfolio table into holding rows plus
/// the highest page number advertised by the pager.
pub fn parse_page(html: &str) -> (Vec<HoldingEntry>, u32) {
    let document = Html::parse_document(html);

    let row_sel = Selector::parse("tr").expect("valid selector");
    let sym_sel = Selector::parse("td.sym").expect("valid selector");
    let stock_sel = Selector::parse("td.stock").expect("valid selector");

    let mut entries = Vec::new();
    for row in document.select(&row_sel) {
        let sym_cell = row.select(&sym_sel).next();
        let stock_cell = row.select(&stock_sel).next();

        if let (Some(sym_cell), Some(stock_cell)) = (sym_cell, stock_cell) {
            let symbol = clean_symbol(&text_content(&sym_cell));
            let stock = text_content(&stock_cell);
            if !symbol.is_empty() && !stock.is_empty() {
                entries.push(HoldingEntry {
                    symbol,
                    stock,
                    exchange: None,
                });
            }
        }
    }

    let total_pages = total_pages(&document);
    (entries, total_pages)
}

fn text_content(el: &scraper::ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn clean_symbol(value: &str) -> String {
    value.split_whitespace().collect::<String>().to_uppercase()
}

fn total_pages(document: &Html) -> u32 {
    let pages_sel = Selector::parse("div#pages").expect("valid selector");
    let link_sel = Selector::parse("a[href]").expect("valid selector");

    let Some(pages_div) = document.select(&pages_sel).next() else {
        return 1;
    };

    pages_div
        .select(&link_sel)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| PAGE_LINK_RE.captures(href))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <table>
          <tr><td class="sym">AAPL</td><td class="stock">Apple Inc</td></tr>
          <tr><td class="sym"> 005930.KS </td><td class="stock">Samsung Electronics</td></tr>
          <tr><td class="other">skip</td></tr>
        </table>
        <div id="pages"><a href="?L=1">1</a><a href="?L=3">3</a><a href="?L=2">2</a></div>
    "#;

    #[test]
    fn parses_rows_and_highest_page() {
        let (entries, pages) = parse_page(SAMPLE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].symbol, "AAPL");
        assert_eq!(entries[1].symbol, "005930.KS");
        assert_eq!(pages, 3);
    }

    #[test]
    fn missing_pager_defaults_to_one_page() {
        let (_, pages) = parse_page("<table></table>");
        assert_eq!(pages, 1);
    }
}
