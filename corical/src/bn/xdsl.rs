use super::{ModelError, Proba};

/// A `<cpt>` element, before its table is shaped.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CptDecl {
    pub(super) id: String,
    pub(super) states: Vec<String>,
    // Declared order is the tensor axis order.
    pub(super) parents: Vec<String>,
    pub(super) probabilities: Vec<Proba>,
}

/// Parse the `<smile><nodes>...</nodes></smile>` document in src and return its CPT nodes in
/// declaration order. Other node kinds (deterministic, equation, ...) are skipped.
pub(super) fn parse(src: &str) -> Result<Vec<CptDecl>, ModelError> {
    let doc = roxmltree::Document::parse(src).map_err(|e| ModelError::Parse(e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("smile") {
        return Err(ModelError::Schema(format!(
            "expected <smile> root element, found <{}>",
            root.tag_name().name()
        )));
    }
    let mut nodes_els = root
        .children()
        .filter(|n| n.has_tag_name("nodes"))
        .peekable();
    if nodes_els.peek().is_none() {
        return Err(ModelError::Schema("missing <nodes> element".to_owned()));
    }
    let mut decls = Vec::new();
    for el in nodes_els.flat_map(|n| n.children()).filter(|n| n.is_element()) {
        if el.has_tag_name("cpt") {
            decls.push(parse_cpt(el)?);
        } else {
            tracing::debug!(
                kind = el.tag_name().name(),
                id = el.attribute("id").unwrap_or_default(),
                "skipping non-CPT node"
            );
        }
    }
    Ok(decls)
}

fn parse_cpt(el: roxmltree::Node) -> Result<CptDecl, ModelError> {
    let id = el
        .attribute("id")
        .ok_or_else(|| ModelError::Schema("<cpt> element without id".to_owned()))?
        .to_owned();
    let states = el
        .children()
        .filter(|n| n.has_tag_name("state"))
        .map(|s| {
            s.attribute("id")
                .map(str::to_owned)
                .ok_or_else(|| ModelError::Schema(format!("node {}: <state> without id", id)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let parents = el
        .children()
        .find(|n| n.has_tag_name("parents"))
        .and_then(|n| n.text())
        .map(|t| t.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default();
    let probabilities = el
        .children()
        .find(|n| n.has_tag_name("probabilities"))
        .ok_or_else(|| {
            ModelError::Schema(format!("node {}: missing <probabilities> element", id))
        })?
        .text()
        .unwrap_or_default()
        .split_whitespace()
        .map(|x| {
            x.parse::<Proba>().map_err(|_| {
                ModelError::Parse(format!("node {}: invalid probability {:?}", id, x))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CptDecl {
        id,
        states,
        parents,
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<smile version="1.0" id="Chain">
    <nodes>
        <cpt id="R">
            <state id="Yes" />
            <state id="No" />
            <probabilities>0.3 0.7</probabilities>
        </cpt>
        <deterministic id="D">
            <state id="A" />
            <resultingstates>A</resultingstates>
        </deterministic>
        <cpt id="C">
            <state id="Yes" />
            <state id="No" />
            <parents>R</parents>
            <probabilities>0.8 0.2
                0.1 0.9</probabilities>
        </cpt>
    </nodes>
</smile>"#;

    #[test]
    fn parse_chain() {
        let decls = parse(CHAIN).unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].id, "R");
        assert!(decls[0].parents.is_empty());
        assert_eq!(decls[1].states, vec!["Yes", "No"]);
        assert_eq!(decls[1].parents, vec!["R"]);
        assert_eq!(decls[1].probabilities, vec![0.8, 0.2, 0.1, 0.9]);
    }

    #[test]
    fn malformed_markup() {
        let res = parse("<smile><nodes><cpt id=\"R\"></nodes></smile>");
        assert!(matches!(res, Err(ModelError::Parse(_))));
    }

    #[test]
    fn missing_probabilities() {
        let src = r#"<smile><nodes><cpt id="R"><state id="Yes"/></cpt></nodes></smile>"#;
        match parse(src) {
            Err(ModelError::Schema(msg)) => assert!(msg.contains("node R")),
            res => panic!("unexpected result {:?}", res),
        }
    }

    #[test]
    fn invalid_number() {
        let src = r#"<smile><nodes><cpt id="R"><state id="Yes"/>
            <probabilities>one</probabilities></cpt></nodes></smile>"#;
        assert!(matches!(parse(src), Err(ModelError::Parse(_))));
    }

    #[test]
    fn wrong_root() {
        let src = r#"<network><nodes/></network>"#;
        assert!(matches!(parse(src), Err(ModelError::Schema(_))));
    }
}
