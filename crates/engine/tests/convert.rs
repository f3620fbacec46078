use std::sync::Arc;

use adfmark_engine::{
    Converter, ConverterConfig, Document, Mark, Node, NodeType, PluginRegistry, convert,
};
use once_cell::sync::Lazy;
use serde_json::json;

static CONVERTER: Lazy<Converter> = Lazy::new(|| {
    Converter::with_registry(
        ConverterConfig::default(),
        Arc::new(PluginRegistry::with_builtins()),
    )
});

fn to_value(markdown: &str) -> serde_json::Value {
    CONVERTER.convert(markdown).to_value()
}

fn limited(config: ConverterConfig) -> Converter {
    Converter::with_registry(config, Arc::new(PluginRegistry::with_builtins()))
}

#[test]
fn empty_and_blank_input() {
    let empty = json!({"version": 1, "type": "doc", "content": []});
    assert_eq!(convert("").to_value(), empty);
    assert_eq!(convert("   ").to_value(), empty);
    assert_eq!(to_value("\n\n\t\n"), empty);
}

#[test]
fn empty_document_snapshot() {
    insta::assert_json_snapshot!(Document::empty(), @r###"
    {
      "version": 1,
      "type": "doc",
      "content": []
    }
    "###);
}

#[test]
fn panel_round_trip() {
    let doc = CONVERTER.convert(":::panel type=\"warning\"\nHello\n:::");
    insta::assert_json_snapshot!(doc, @r###"
    {
      "version": 1,
      "type": "doc",
      "content": [
        {
          "type": "panel",
          "attrs": {
            "panelType": "warning"
          },
          "content": [
            {
              "type": "paragraph",
              "content": [
                {
                  "type": "text",
                  "text": "Hello"
                }
              ]
            }
          ]
        }
      ]
    }
    "###);
}

#[test]
fn every_document_has_the_fixed_root() {
    let inputs = [
        "",
        "plain",
        "# h\n\n- a\n- b",
        "{panel:info}\nbody\n{panel}",
        "| a |\n| b |",
        ":::layout columns=2\n::: column\nleft\n:::\n:::",
    ];
    for input in inputs {
        let value = to_value(input);
        assert_eq!(value["version"], 1, "{input:?}");
        assert_eq!(value["type"], "doc", "{input:?}");
        assert!(value["content"].is_array(), "{input:?}");
    }
}

#[test]
fn repeated_conversion_is_deterministic() {
    let input = "# Title\n\nSome **bold** and `code` with [a link](https://example.com).\n\n- one\n- two\n\n| h |\n|---|\n| v |";
    let uncached = limited(ConverterConfig {
        cache_size: 0,
        ..Default::default()
    });
    let first = CONVERTER.convert(input);
    let second = CONVERTER.convert(input);
    let third = uncached.convert(input);
    let fourth = uncached.convert(input);
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(third, fourth);
}

#[test]
fn list_truncation() {
    let max = 5;
    let converter = limited(ConverterConfig {
        max_list_items: max,
        ..Default::default()
    });
    let input: String = (0..max + 5).map(|i| format!("- item {i}\n")).collect();
    let doc = converter.convert(&input);
    let list = &doc.content[0];
    assert_eq!(list.node_type, NodeType::BulletList);
    assert_eq!(list.children().len(), max + 1);
    let last = list.children().last().unwrap();
    assert_eq!(last.plain_text(), "[Truncated: 5 more items]");
}

#[test]
fn table_header_detection() {
    let value = to_value("| A | B |\n| - | - |\n| 1 | 2 |");
    let rows = value["content"][0]["content"].as_array().unwrap();
    for cell in rows[0]["content"].as_array().unwrap() {
        assert_eq!(cell["type"], "tableHeader");
    }
    for cell in rows[1]["content"].as_array().unwrap() {
        assert_eq!(cell["type"], "tableCell");
    }
}

#[test]
fn table_rows_truncate() {
    let converter = limited(ConverterConfig {
        max_table_rows: 3,
        ..Default::default()
    });
    let input: String = (0..10).map(|i| format!("| {i} | x |\n")).collect();
    let doc = converter.convert(&input);
    let rows = doc.content[0].children();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].plain_text(), "[Truncated: 7 more rows]");
}

#[test]
fn mark_exclusivity() {
    let node = Node::text_with_marks(
        "x",
        &[Mark::Code, Mark::text_color("#ff0000"), Mark::link("https://example.com")],
    );
    let tags: Vec<&str> = node.marks.iter().map(Mark::tag).collect();
    assert_eq!(tags, vec!["code", "link"]);
}

#[test]
fn nesting_is_bounded() {
    let converter = limited(ConverterConfig {
        max_nesting_depth: 3,
        ..Default::default()
    });
    let input = format!("{}deep", "> ".repeat(20));
    let doc = converter.convert(&input);

    let mut depth = 0;
    let mut node = &doc.content[0];
    while node.node_type == NodeType::Blockquote {
        depth += 1;
        node = &node.children()[0];
    }
    assert_eq!(depth, 4);
    assert_eq!(
        node.plain_text(),
        "[Truncated: maximum nesting depth of 3 reached]"
    );
}

#[test]
fn nested_panels_are_bounded() {
    let converter = limited(ConverterConfig {
        max_nesting_depth: 2,
        ..Default::default()
    });
    let input = format!("{}core\n{}", ":::panel\n".repeat(6), ":::\n".repeat(6));
    let doc = converter.convert(&input);
    let text = doc.content[0].plain_text();
    assert!(text.contains("maximum nesting depth of 2"), "{text}");
    assert!(!text.contains("core"));
}

#[test]
fn deeply_nested_failing_directives_stay_bounded() {
    let depth = 20_000;
    let input = format!("{}x\n{}", ":::media\n".repeat(depth), ":::\n".repeat(depth));
    let doc = CONVERTER.convert(&input);
    let max = ConverterConfig::default().max_nesting_depth;
    assert_eq!(doc.content.len(), 2 * (max + 1) + 1);
    let notices = doc
        .content
        .iter()
        .filter(|node| node.plain_text().starts_with("[Truncated: maximum nesting depth"))
        .count();
    assert_eq!(notices, 1);
}

#[test]
fn wiki_macros() {
    let value = to_value(
        "{panel:note}\nDeploy {status:green}done{status} by @[Ada Lovelace] on {date:2024-01-01}\n{panel}",
    );
    let panel = &value["content"][0];
    assert_eq!(panel["attrs"]["panelType"], "note");
    let inline = panel["content"][0]["content"].as_array().unwrap();
    let types: Vec<&str> = inline.iter().map(|n| n["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["text", "status", "text", "mention", "text", "date"]);
    assert_eq!(inline[1]["attrs"], json!({"text": "done", "color": "green"}));
    assert_eq!(inline[3]["attrs"]["id"], "ada.lovelace");
    assert_eq!(inline[5]["attrs"], json!({"timestamp": "1704067200000"}));
}

#[test]
fn mentions_from_both_syntaxes() {
    let value = to_value("ping @[Ada Lovelace] and @bob");
    let inline = value["content"][0]["content"].as_array().unwrap();
    assert_eq!(inline[1]["attrs"], json!({"id": "ada.lovelace", "text": "@Ada Lovelace"}));
    assert_eq!(inline[3]["attrs"], json!({"id": "bob", "text": "@bob"}));
}

#[test]
fn status_plugin_syntax() {
    let value = to_value("{status:color=purple}Beta{/status}");
    assert_eq!(
        value["content"][0]["content"][0],
        json!({"type": "status", "attrs": {"text": "Beta", "color": "purple"}})
    );
}

#[test]
fn expand_with_default_title() {
    let value = to_value(":::expand\nhidden\n:::");
    assert_eq!(value["content"][0]["type"], "expand");
    assert_eq!(value["content"][0]["attrs"]["title"], "Click to expand");
}

#[test]
fn media_block() {
    let value = to_value(":::media\nid: abc-123\ncollection: uploads\nwidth: 640\nheight: -1\nlayout: wide\n:::");
    assert_eq!(
        value["content"][0],
        json!({
            "type": "mediaSingle",
            "attrs": {"layout": "wide"},
            "content": [{
                "type": "media",
                "attrs": {
                    "id": "abc-123",
                    "collection": "uploads",
                    "width": 640,
                    "height": "-1",
                    "type": "file"
                }
            }]
        })
    );
}

#[test]
fn layout_pads_columns() {
    let value = to_value(":::layout columns=3\n::: column\nleft\n:::\n::: column\nmiddle\n:::\n:::");
    let section = &value["content"][0];
    assert_eq!(section["type"], "layoutSection");
    let columns = section["content"].as_array().unwrap();
    assert_eq!(columns.len(), 3);
    for column in columns {
        assert_eq!(column["type"], "layoutColumn");
        assert_eq!(column["attrs"]["width"], 33.33);
    }
    assert_eq!(columns[2]["content"], json!([{"type": "paragraph", "content": []}]));
}

#[test]
fn macros_in_code_are_literal() {
    let value = to_value("```\n{status:green}x{status} :smile:\n```\n\n`@[Name]`");
    assert_eq!(
        value["content"][0]["content"][0]["text"],
        "{status:green}x{status} :smile:"
    );
    assert_eq!(value["content"][1]["content"][0]["text"], "@[Name]");
}

#[test]
fn unknown_macros_stay_text() {
    let value = to_value("{panel:info} never closed and :not_an_emoji:");
    assert_eq!(
        value["content"][0]["content"][0]["text"],
        "{panel:info} never closed and :not_an_emoji:"
    );
}

#[test]
fn metrics_track_node_types() {
    let converter = limited(ConverterConfig::default());
    converter.convert("# a\n\nb");
    let metrics = converter.metrics();
    assert_eq!(metrics.node_types.get("heading"), Some(&1));
    assert_eq!(metrics.node_types.get("paragraph"), Some(&1));
    assert_eq!(metrics.errors, 0);
}

#[test]
fn concurrent_conversions_agree() {
    let input = "- a\n- b\n\n:::panel type=\"success\"\n**ok** :tada:\n:::";
    let expected = CONVERTER.convert(input);
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(move || CONVERTER.convert(input)))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
