//! ラベルXML（画像ごとのサイドカー）の生成と読み込み
//!
//! ```text
//! <annotation>
//!   <filename>IMAGE_BASENAME</filename>
//!   <object>
//!     <name>LABEL</name>
//!     <bndbox><xmin/><ymin/><xmax/><ymax/></bndbox>
//!   </object>
//! </annotation>
//! ```
//!
//! 信頼度は出力しない。

use crate::error::{Error, Result};
use crate::types::{BBox, Detection};
use quick_xml::events::Event;
use quick_xml::Reader;

/// `<object>` 1件分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelObject {
    pub name: String,
    pub bbox: BBox,
}

/// ラベルファイル全体
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFile {
    pub filename: String,
    pub objects: Vec<LabelObject>,
}

impl LabelFile {
    pub fn from_detections(filename: &str, detections: &[Detection]) -> Self {
        Self {
            filename: filename.to_string(),
            objects: detections
                .iter()
                .map(|d| LabelObject {
                    name: d.label.clone(),
                    bbox: d.bbox,
                })
                .collect(),
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str("<annotation>\n");
        xml.push_str(&format!("  <filename>{}</filename>\n", escape_xml(&self.filename)));

        for obj in &self.objects {
            xml.push_str("  <object>\n");
            xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&obj.name)));
            xml.push_str("    <bndbox>\n");
            xml.push_str(&format!("      <xmin>{}</xmin>\n", obj.bbox.xmin));
            xml.push_str(&format!("      <ymin>{}</ymin>\n", obj.bbox.ymin));
            xml.push_str(&format!("      <xmax>{}</xmax>\n", obj.bbox.xmax));
            xml.push_str(&format!("      <ymax>{}</ymax>\n", obj.bbox.ymax));
            xml.push_str("    </bndbox>\n");
            xml.push_str("  </object>\n");
        }

        xml.push_str("</annotation>\n");
        xml
    }
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// 検出結果からラベルXMLを生成
pub fn build_label_xml(filename: &str, detections: &[Detection]) -> String {
    LabelFile::from_detections(filename, detections).to_xml()
}

#[derive(Default)]
struct ObjectBuilder {
    name: String,
    xmin: Option<i32>,
    ymin: Option<i32>,
    xmax: Option<i32>,
    ymax: Option<i32>,
}

impl ObjectBuilder {
    fn finish(self) -> Result<LabelObject> {
        match (self.xmin, self.ymin, self.xmax, self.ymax) {
            (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) => Ok(LabelObject {
                name: self.name,
                bbox: BBox::new(xmin, ymin, xmax, ymax),
            }),
            _ => Err(Error::Xml(format!("bndboxが不完全です: {}", self.name))),
        }
    }
}

fn parse_coord(tag: &str, text: &str) -> Result<i32> {
    text.trim()
        .parse::<i32>()
        .map_err(|_| Error::Xml(format!("<{}> の値が整数ではありません: {}", tag, text)))
}

/// ラベルXMLを読み込む
pub fn parse_label_xml(xml: &str) -> Result<LabelFile> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut file = LabelFile::default();
    let mut current: Option<ObjectBuilder> = None;
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if path.is_empty() {
                    if tag != "annotation" {
                        return Err(Error::Xml(format!("ルート要素が annotation ではありません: {}", tag)));
                    }
                    seen_root = true;
                }
                if tag == "object" && path.len() == 1 {
                    current = Some(ObjectBuilder::default());
                }
                path.push(tag);
            }
            Event::End(_) => {
                if let Some(tag) = path.pop() {
                    if tag == "object" && path.len() == 1 {
                        if let Some(builder) = current.take() {
                            file.objects.push(builder.finish()?);
                        }
                    }
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::Xml(e.to_string()))?
                    .into_owned();
                let tags: Vec<&str> = path.iter().map(String::as_str).collect();
                match tags.as_slice() {
                    ["annotation", "filename"] => file.filename = text,
                    ["annotation", "object", "name"] => {
                        if let Some(obj) = current.as_mut() {
                            obj.name = text;
                        }
                    }
                    ["annotation", "object", "bndbox", coord] => {
                        if let Some(obj) = current.as_mut() {
                            let value = parse_coord(coord, &text)?;
                            match *coord {
                                "xmin" => obj.xmin = Some(value),
                                "ymin" => obj.ymin = Some(value),
                                "xmax" => obj.xmax = Some(value),
                                "ymax" => obj.ymax = Some(value),
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(Error::Xml("annotation 要素がありません".into()));
    }
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, bbox: BBox, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            bbox,
            confidence,
        }
    }

    #[test]
    fn test_build_contains_objects_without_confidence() {
        let xml = build_label_xml(
            "a.jpg",
            &[det("diatom", BBox::new(1, 2, 30, 40), 0.91)],
        );
        assert!(xml.contains("<filename>a.jpg</filename>"));
        assert!(xml.contains("<name>diatom</name>"));
        assert!(xml.contains("<xmin>1</xmin>"));
        assert!(xml.contains("<ymax>40</ymax>"));
        assert!(!xml.contains("0.91"));
        assert_eq!(xml.matches("<object>").count(), 1);
    }

    #[test]
    fn test_build_empty_annotation() {
        let xml = build_label_xml("empty.png", &[]);
        assert!(!xml.contains("<object>"));
        let parsed = parse_label_xml(&xml).unwrap();
        assert_eq!(parsed.filename, "empty.png");
        assert!(parsed.objects.is_empty());
    }

    #[test]
    fn test_round_trip_drops_confidence_only() {
        let detections = vec![
            det("diatom", BBox::new(10, 20, 110, 220), 0.5),
            det("a<b & \"c\"", BBox::new(0, 0, 5, 5), 0.99),
            det("diatom", BBox::new(10, 20, 110, 220), 0.3),
        ];
        let parsed = parse_label_xml(&build_label_xml("x&y.jpg", &detections)).unwrap();
        assert_eq!(parsed.filename, "x&y.jpg");
        let expected: Vec<(String, BBox)> =
            detections.iter().map(|d| (d.label.clone(), d.bbox)).collect();
        let actual: Vec<(String, BBox)> =
            parsed.objects.iter().map(|o| (o.name.clone(), o.bbox)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_parse_compact_form() {
        // ElementTree.write 相当（改行・宣言なし）
        let xml = "<annotation><filename>b.png</filename><object><name>ciliate</name>\
                   <bndbox><xmin>3</xmin><ymin>4</ymin><xmax>9</xmax><ymax>12</ymax></bndbox>\
                   </object></annotation>";
        let parsed = parse_label_xml(xml).unwrap();
        assert_eq!(parsed.objects.len(), 1);
        assert_eq!(parsed.objects[0].bbox, BBox::new(3, 4, 9, 12));
    }

    #[test]
    fn test_parse_incomplete_bndbox() {
        let xml = "<annotation><object><name>x</name><bndbox><xmin>1</xmin></bndbox></object></annotation>";
        assert!(matches!(parse_label_xml(xml), Err(Error::Xml(_))));
    }

    #[test]
    fn test_parse_wrong_root() {
        assert!(parse_label_xml("<dataset></dataset>").is_err());
        assert!(parse_label_xml("").is_err());
    }

    #[test]
    fn test_parse_non_integer_coordinate() {
        let xml = "<annotation><object><name>x</name><bndbox><xmin>1.5</xmin></bndbox></object></annotation>";
        assert!(parse_label_xml(xml).is_err());
    }
}
