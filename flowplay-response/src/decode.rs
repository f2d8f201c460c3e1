use flowplay_model::{Component, ObjectDataItem};

/// Injected text-decoding capability: hosts escape entity content, the
/// client stores plain text.
pub trait TextDecoder: Send + Sync {
  fn decode(&self, text: &str) -> String;
}

/// Decodes HTML entities. Undecodable input passes through untouched.
pub struct HtmlTextDecoder;

impl TextDecoder for HtmlTextDecoder {
  fn decode(&self, text: &str) -> String {
    htmlescape::decode_html(text).unwrap_or_else(|_| text.to_owned())
  }
}

/// Identity decoder for hosts that send plain text already.
pub struct NoopTextDecoder;

impl TextDecoder for NoopTextDecoder {
  fn decode(&self, text: &str) -> String {
    text.to_owned()
  }
}

/// Decode a component's content value and every property content value of
/// its data items, recursively.
pub fn decode_component(component: &mut Component, decoder: &dyn TextDecoder) {
  if let Some(value) = &component.content_value {
    component.content_value = Some(decoder.decode(value));
  }
  if let Some(items) = component.object_data.as_mut() {
    for item in items {
      decode_item(item, decoder);
    }
  }
}

fn decode_item(item: &mut ObjectDataItem, decoder: &dyn TextDecoder) {
  for property in &mut item.properties {
    if let Some(value) = &property.content_value {
      property.content_value = Some(decoder.decode(value));
    }
    if let Some(nested) = property.object_data.as_mut() {
      for item in nested {
        decode_item(item, decoder);
      }
    }
  }
}
