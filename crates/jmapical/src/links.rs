//! Links translator: `ATTACH` + `URL` ↔ `links`.

use jmapical_rfc::core::{Component, Parameter, Property, Value};
use serde_json::{json, Map, Value as Json};

use crate::context::Context;
use crate::util::{self, xname};

/// Converts one ATTACH or URL property into a Link object.
///
/// Binary attachments and empty hrefs yield `None`.
fn link_from_ical(prop: &Property) -> Option<Json> {
    let is_url_prop = prop.name == "URL";

    if matches!(prop.value, Value::Binary(_)) {
        return None;
    }
    if prop
        .get_param_value("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("BINARY"))
    {
        return None;
    }
    let href = prop.value_as_string();
    if href.is_empty() {
        return None;
    }

    let mut link = Map::new();
    link.insert("href".to_string(), json!(href));

    if let Some(cid) = prop.get_param_value(xname::CID) {
        link.insert("cid".to_string(), json!(cid));
    }
    if let Some(mime) = prop.get_param_value("FMTTYPE") {
        link.insert("type".to_string(), json!(mime));
    }
    if let Some(title) = prop.get_param_value(xname::TITLE) {
        link.insert("title".to_string(), json!(title));
    }
    if let Some(size) = prop.get_param_value("SIZE") {
        // Strictly numeric or null.
        match size.parse::<i64>() {
            Ok(size) if size >= 0 => {
                link.insert("size".to_string(), json!(size));
            }
            _ => {
                link.insert("size".to_string(), Json::Null);
            }
        }
    }

    let rel = prop
        .get_param_value(xname::REL)
        .unwrap_or(if is_url_prop { "describedby" } else { "enclosure" });
    link.insert("rel".to_string(), json!(rel));

    if let Some(display) = prop.get_param_value(xname::DISPLAY) {
        link.insert("display".to_string(), json!(display));
    }

    Some(Json::Object(link))
}

/// Stable link id: `X-JMAP-ID`, else the SHA-1 of the raw value text.
fn link_id_of(prop: &Property) -> String {
    prop.get_param_value(xname::ID).map_or_else(
        || util::sha1_key(prop.value_as_string()),
        str::to_string,
    )
}

/// Collects the `links` map from ATTACH and URL properties, or JSON
/// null without any.
#[must_use]
pub fn links_from_ical(ctx: &mut Context, comp: &Component) -> Json {
    let mut links = Map::new();

    for name in ["ATTACH", "URL"] {
        for prop in comp.get_properties(name) {
            let id = link_id_of(prop);
            ctx.begin_prop_key("links", &id);
            if let Some(link) = link_from_ical(prop) {
                links.insert(id.clone(), link);
            }
            ctx.end_prop();
        }
    }

    if links.is_empty() {
        Json::Null
    } else {
        Json::Object(links)
    }
}

/// Writes the `links` map. A link that is nothing but a `describedby`
/// href collapses into the single URL property; everything else becomes
/// ATTACH.
pub fn links_to_ical(ctx: &mut Context, comp: &mut Component, links: &Json, propname: &str) {
    comp.remove_properties("ATTACH");
    comp.remove_properties("URL");

    let Json::Object(links) = links else {
        return;
    };

    for (id, link) in links {
        ctx.begin_prop_key(propname, id);

        if !util::is_valid_jmap_id(id) {
            ctx.invalid_prop(None);
            ctx.end_prop();
            continue;
        }

        let before = ctx.invalid_count();

        let href = match link.get("href") {
            Some(Json::String(href)) if !href.is_empty() => Some(href.as_str()),
            _ => {
                ctx.invalid_prop(Some("href"));
                None
            }
        };

        let mut read_str = |ctx: &mut Context, field: &str| -> Option<String> {
            match link.get(field) {
                None | Some(Json::Null) => None,
                Some(Json::String(s)) => Some(s.clone()),
                Some(_) => {
                    ctx.invalid_prop(Some(field));
                    None
                }
            }
        };

        let mime = read_str(ctx, "type");
        let title = read_str(ctx, "title");
        let cid = read_str(ctx, "cid");
        let display = read_str(ctx, "display");
        let rel = read_str(ctx, "rel");

        let mut size = None;
        match link.get("size") {
            None | Some(Json::Null) => {}
            Some(Json::Number(n)) if n.as_i64().is_some_and(|v| v >= 0) => {
                size = n.as_u64();
            }
            Some(_) => ctx.invalid_prop(Some("size")),
        }

        if let Some(rel) = &rel {
            if !util::is_valid_reg_rel(rel) {
                ctx.invalid_prop(Some("rel"));
            }
        }

        if let (Some(href), true) = (href, ctx.invalid_count() == before) {
            // A bare describedby link becomes the URL property, if none
            // exists yet.
            let mut prop = if rel.as_deref() == Some("describedby")
                && comp.get_property("URL").is_none()
                && link.as_object().map_or(0, Map::len) == 2
            {
                Property::uri("URL", href)
            } else {
                Property::uri("ATTACH", href)
            };

            if let Some(mime) = mime {
                prop.add_param(Parameter::fmttype(mime));
            }
            if let Some(title) = title {
                prop.set_param(Parameter::new(xname::TITLE, title));
            }
            if let Some(cid) = cid {
                prop.set_param(Parameter::new(xname::CID, cid));
            }
            if let Some(size) = size {
                prop.add_param(Parameter::size(size));
            }
            if let Some(rel) = rel {
                // enclosure is the implied default and not persisted.
                if rel != "enclosure" {
                    prop.set_param(Parameter::new(xname::REL, rel));
                }
            }
            prop.set_param(Parameter::new(xname::ID, id));
            if let Some(display) = display {
                prop.set_param(Parameter::new(xname::DISPLAY, display));
            }

            comp.add_property(prop);
        }

        ctx.end_prop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_link_defaults_to_describedby() {
        let mut comp = Component::event();
        comp.add_property(Property::uri("URL", "https://example.com/event"));

        let mut ctx = Context::read(None);
        let links = links_from_ical(&mut ctx, &comp);
        let link = links.as_object().unwrap().values().next().unwrap();
        assert_eq!(link["href"], json!("https://example.com/event"));
        assert_eq!(link["rel"], json!("describedby"));
    }

    #[test]
    fn attach_link_defaults_to_enclosure() {
        let mut comp = Component::event();
        comp.add_property(Property::uri("ATTACH", "https://example.com/agenda.pdf"));

        let mut ctx = Context::read(None);
        let links = links_from_ical(&mut ctx, &comp);
        let link = links.as_object().unwrap().values().next().unwrap();
        assert_eq!(link["rel"], json!("enclosure"));
    }

    #[test]
    fn binary_attach_is_skipped() {
        let mut comp = Component::event();
        let mut prop = Property::uri("ATTACH", "AAAB");
        prop.add_param(Parameter::value_type("BINARY"));
        comp.add_property(prop);

        let mut ctx = Context::read(None);
        assert_eq!(links_from_ical(&mut ctx, &comp), Json::Null);
    }

    #[test]
    fn size_must_be_integer() {
        let mut comp = Component::event();
        let mut prop = Property::uri("ATTACH", "https://example.com/f");
        prop.add_param(Parameter::new("SIZE", "12x"));
        comp.add_property(prop);

        let mut ctx = Context::read(None);
        let links = links_from_ical(&mut ctx, &comp);
        let link = links.as_object().unwrap().values().next().unwrap();
        assert_eq!(link["size"], Json::Null);
    }

    #[test]
    fn write_collapses_bare_describedby_to_url() {
        let mut comp = Component::event();
        let mut ctx = Context::write();
        let links = json!({
            "l1": {"href": "https://example.com/event", "rel": "describedby"},
        });
        links_to_ical(&mut ctx, &mut comp, &links, "links");
        assert!(!ctx.has_invalid());
        let url = comp.get_property("URL").unwrap();
        assert_eq!(url.raw_value, "https://example.com/event");
        assert_eq!(url.get_param_value(xname::ID), Some("l1"));
        assert!(comp.get_property("ATTACH").is_none());
    }

    #[test]
    fn write_full_link_becomes_attach() {
        let mut comp = Component::event();
        let mut ctx = Context::write();
        let links = json!({
            "l1": {
                "href": "https://example.com/agenda.pdf",
                "type": "application/pdf",
                "title": "Agenda",
                "size": 40960,
            },
        });
        links_to_ical(&mut ctx, &mut comp, &links, "links");
        assert!(!ctx.has_invalid());
        let attach = comp.get_property("ATTACH").unwrap();
        assert_eq!(attach.get_param_value("FMTTYPE"), Some("application/pdf"));
        assert_eq!(attach.get_param_value("SIZE"), Some("40960"));
        assert_eq!(attach.get_param_value(xname::TITLE), Some("Agenda"));
    }

    #[test]
    fn write_rejects_bad_rel() {
        let mut comp = Component::event();
        let mut ctx = Context::write();
        let links = json!({
            "l1": {"href": "https://example.com/x", "rel": "Not Valid"},
        });
        links_to_ical(&mut ctx, &mut comp, &links, "links");
        assert!(ctx.invalid_props().contains(&"links/l1/rel".to_string()));
        assert!(comp.get_property("ATTACH").is_none());
    }
}
