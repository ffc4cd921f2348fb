//! Sample manifests for testing and demonstration.
//!
//! Each manifest exercises different markup features and manifest shapes.
//! They are plain JSON strings, ready to feed through [`crate::compose::Manifest`].

/// Minimal manifest for unit testing.
pub fn minimal_manifest() -> &'static str {
    r#"{
  "config": { "title": "Minimal" },
  "chapters": [
    { "index": 1, "title": "Only", "body": "Body text." }
  ]
}"#
}

/// A short nonfiction book with styled prose, images in every placement,
/// and non-default render options.
pub fn field_guide_manifest() -> &'static str {
    r#"{
  "config": {
    "title": "A Field Guide to the Drowned Fens",
    "topic": "walking the fen country after the floods",
    "genre": "nonfiction",
    "audience": "readers who walk",
    "tone": "quiet and observant",
    "chapterCount": 4,
    "wordsPerChapter": 400,
    "dedication": "For the keepers of the sluice gates."
  },
  "chapters": [
    {
      "index": 1,
      "title": "The First Morning",
      "body": "Morning came up slowly over the water, and the path held its silence a while longer. We walked the first mile before the mist lifted, boots finding the boards by feel.\n\nThe notebook stayed dry in its oilcloth wrap. **Three herons** stood in the shallows and *none of them moved* as we passed.\n\n## What the Path Keeps\n\nEvery path keeps a record of its walkers, and this one is no different:\n\n- a worn stile at the second gate\n- flint chips where the track bends east\n- initials cut into the oak rail, older than the map\n\n> The land remembers longer than we do.\n\nBy noon the fen opened out and the wind took over the conversation."
    },
    {
      "index": 2,
      "title": "Reading the Water",
      "body": "Water writes in a hand you learn slowly. A smooth patch over the channel means depth; a standing ripple means a sill of gravel close beneath.\n\nThe old keepers read it without looking, the way a typesetter reads a page upside down. We are slower, so we stop, and stopping is most of the craft.\n\n### Marks Worth Knowing\n\n- foam lines where two flows meet\n- the dull seam of a drowned wall\n- reeds leaning against the current, not with it"
    },
    {
      "index": 3,
      "title": "The Drowned Road",
      "body": "The causeway shows itself twice a day, and for an hour each time you can walk where carts once ran. The stones are ribbed with weed but still squared, still set.\n\n> A road does not stop being a road because the sea disagrees.\n\nHalfway over there is a milestone with its numbers licked smooth. We gave it a minute of standing, which is what you give things that have outlasted their errand.\n\nThe far bank keeps a bench and a gate and no explanation for either."
    },
    {
      "index": 4,
      "title": "Turning for Home",
      "body": "Home is mostly a direction before it is a place. We turned into the wind and the fen changed character entirely, the way a room does when you face the window.\n\nWhat we carried back weighed nothing: a bird list, two sketches, the smell of wet rope. The gate latched behind us on the first try, which the keeper says is the fen agreeing to let you go."
    }
  ],
  "images": [
    {
      "id": "pixel-badge",
      "name": "press-mark",
      "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==",
      "mime": "png",
      "placement": { "type": "cover", "slot": "badge" }
    },
    {
      "id": "pixel-plate",
      "name": "causeway-plate",
      "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==",
      "mime": "png",
      "caption": "The causeway at slack water.",
      "placement": { "type": "gallery" }
    },
    {
      "id": "pixel-margin",
      "name": "heron-sketch",
      "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==",
      "mime": "png",
      "caption": "Heron, not moving.",
      "placement": { "type": "chapter", "chapterIndex": 1, "anchor": "middle" }
    }
  ],
  "options": {
    "theme": "slate",
    "bodyFont": { "family": "times", "size": 11.5 },
    "dropCaps": true
  }
}"#
}

/// One chapter exercising every block and inline form the markup knows.
/// The body text contains `"#` sequences, hence the wider raw delimiter.
pub fn all_blocks_manifest() -> &'static str {
    r##"{
  "config": { "title": "Every Element", "chapterCount": 1 },
  "chapters": [
    {
      "index": 1,
      "title": "All of It",
      "body": "# Heading One\n\n## Heading Two\n\n### Heading Three\n\nA paragraph with **bold**, *italic*, __strong__, _slanted_ and `code` text, plus an unmatched ** marker kept literal.\n\n- first unordered item\n- second unordered item\n+ plus-marked item\n* star-marked item\n\n> A quoted line.\n> A second quoted line.\n\nA closing paragraph after the quotes."
    }
  ]
}"##
}

#[cfg(test)]
mod tests {
    use crate::compose::Manifest;

    #[test]
    fn sample_manifests_parse_and_validate() {
        let samples: Vec<(&str, &str)> = vec![
            ("minimal", super::minimal_manifest()),
            ("field_guide", super::field_guide_manifest()),
            ("all_blocks", super::all_blocks_manifest()),
        ];

        for (name, raw) in samples {
            let manifest = Manifest::from_json(raw)
                .unwrap_or_else(|e| panic!("sample '{name}' should parse: {e}"));
            let manuscript = manifest
                .manuscript()
                .unwrap_or_else(|e| panic!("sample '{name}' should carry chapters: {e}"));
            manuscript
                .validate()
                .unwrap_or_else(|e| panic!("sample '{name}' should validate: {e}"));
            assert!(!manuscript.chapters.is_empty());
        }
    }

    #[test]
    fn all_blocks_body_keeps_heading_markers() {
        let manifest = Manifest::from_json(super::all_blocks_manifest()).unwrap();
        let manuscript = manifest.manuscript().unwrap();
        let body = &manuscript.chapters[0].body;
        assert!(body.starts_with("# Heading One"));
        assert!(body.contains("## Heading Two"));
        let blocks = crate::markup::parse(body);
        assert!(blocks.len() >= 8);
    }

    #[test]
    fn field_guide_images_cover_every_placement() {
        let manifest = Manifest::from_json(super::field_guide_manifest()).unwrap();
        assert_eq!(manifest.images.len(), 3);
        let plan = crate::images::ImagePlan::partition(&manifest.images);
        assert!(plan.cover_badge.is_some());
        assert_eq!(plan.gallery.len(), 1);
        assert_eq!(plan.for_chapter(1).len(), 1);
    }

    #[test]
    fn field_guide_options_override_defaults() {
        let manifest = Manifest::from_json(super::field_guide_manifest()).unwrap();
        assert!(manifest.options.drop_caps);
        assert_eq!(manifest.options.theme().name, "slate");
    }
}
