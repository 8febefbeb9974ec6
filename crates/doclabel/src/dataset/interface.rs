//! Labeling interface definition matching the emitted task schema.

use quick_xml::escape::escape;

use super::schema::{BBOX_FROM_NAME, IMAGE_DATA_KEY, IMAGE_TO_NAME, TRANSCRIPTION_FROM_NAME};

/// Control name of the per-region label set; exported as `label`.
pub const LABELS_FROM_NAME: &str = "label";

/// Labeling config XML: image, labels, bounding box, and per-region
/// transcription, wired to the names tasks use.
pub fn labeling_config<S: AsRef<str>>(labels: &[S]) -> String {
    let mut xml = String::from("<View>\n");
    xml.push_str(&format!(
        "  <Image name=\"{}\" value=\"${}\"/>\n",
        IMAGE_TO_NAME, IMAGE_DATA_KEY
    ));

    xml.push_str(&format!(
        "  <Labels name=\"{}\" toName=\"{}\">\n",
        LABELS_FROM_NAME, IMAGE_TO_NAME
    ));
    for label in labels {
        xml.push_str(&format!(
            "    <Label value=\"{}\"/>\n",
            escape(label.as_ref())
        ));
    }
    xml.push_str("  </Labels>\n");

    xml.push_str(&format!(
        "  <Rectangle name=\"{}\" toName=\"{}\" strokeWidth=\"3\"/>\n",
        BBOX_FROM_NAME, IMAGE_TO_NAME
    ));
    xml.push_str(&format!(
        "  <TextArea name=\"{}\" toName=\"{}\" editable=\"true\" perRegion=\"true\" \
         required=\"true\" maxSubmissions=\"1\" rows=\"5\" placeholder=\"Recognized Text\" \
         displayMode=\"region-list\"/>\n",
        TRANSCRIPTION_FROM_NAME, IMAGE_TO_NAME
    ));
    xml.push_str("</View>\n");
    xml
}
