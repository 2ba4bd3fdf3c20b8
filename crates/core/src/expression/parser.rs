//! Recursive-descent parser over the expression token stream.
//!
//! Parsing is all-or-nothing: any deviation from a variant's pattern is
//! `GrammarError::Malformed`. Field types and entity types are not checked
//! against anything here.

use super::{
    ComponentProp, Expression, FieldItemPath, FieldTypeObjectProps, FieldTypeProp,
    ObjectPropTarget, ReferenceFieldTypeProp, ReferencedField, StructuredDataProp,
};
use crate::error::GrammarError;
use crate::lexer::{self, Spanned, Token};

pub fn parse(input: &str) -> Result<Expression, GrammarError> {
    let tokens = lexer::lex(input)?;
    let mut p = Parser::new(&tokens, input);
    let expr = p.parse_expression()?;
    p.expect(Token::Eof)?;
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned], input: &'a str) -> Self {
        Parser {
            tokens,
            pos: 0,
            input,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) -> &Spanned {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> GrammarError {
        GrammarError::malformed(self.input, self.cur().offset, msg)
    }

    fn expect(&mut self, expected: Token) -> Result<(), GrammarError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!(
                "expected {}, got {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    /// A name that may not contain the entity/bundle colon.
    fn take_name(&mut self, what: &str) -> Result<String, GrammarError> {
        match self.peek().clone() {
            Token::Name(n) if n.contains(':') => Err(self.err(format!(
                "{} '{}' may not contain ':'; it only separates entity type and bundle",
                what, n
            ))),
            Token::Name(n) => {
                self.advance();
                Ok(n)
            }
            other => Err(self.err(format!("expected {}, got {}", what, other.describe()))),
        }
    }

    /// `{entity_type}` or `{entity_type}:{bundle}`.
    fn take_entity(&mut self) -> Result<(String, Option<String>), GrammarError> {
        let Token::Name(n) = self.peek().clone() else {
            return Err(self.err(format!(
                "expected entity type, got {}",
                self.peek().describe()
            )));
        };
        let mut parts = n.split(':');
        let entity_type = parts.next().unwrap_or_default().to_owned();
        let bundle = parts.next().map(str::to_owned);
        if parts.next().is_some() {
            return Err(self.err(format!("entity '{}' has more than one ':'", n)));
        }
        if entity_type.is_empty() || bundle.as_deref() == Some("") {
            return Err(self.err(format!("entity '{}' has an empty entity type or bundle", n)));
        }
        self.advance();
        Ok((entity_type, bundle))
    }

    fn take_delta(&mut self) -> Result<u32, GrammarError> {
        let Token::Name(n) = self.peek().clone() else {
            return Err(self.err(format!("expected delta, got {}", self.peek().describe())));
        };
        if !n.chars().all(|c| c.is_ascii_digit()) || (n.len() > 1 && n.starts_with('0')) {
            return Err(self.err(format!("delta '{}' is not a canonical non-negative integer", n)));
        }
        let delta = n
            .parse::<u32>()
            .map_err(|_| self.err(format!("delta '{}' is out of range", n)))?;
        self.advance();
        Ok(delta)
    }

    // -- Variants ------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression, GrammarError> {
        match self.peek() {
            Token::StructuredData => {
                self.advance();
                self.parse_structured_data_body()
            }
            Token::Component => {
                self.advance();
                self.parse_component_prop()
            }
            other => Err(self.err(format!(
                "expected structured data or component marker, got {}",
                other.describe()
            ))),
        }
    }

    fn parse_component_prop(&mut self) -> Result<Expression, GrammarError> {
        let component_instance_uuid = self.take_name("component instance uuid")?;
        self.expect(Token::PropertyLevel)?;
        let prop_name = self.take_name("prop name")?;
        Ok(ComponentProp {
            component_instance_uuid,
            prop_name,
        }
        .into())
    }

    fn parse_structured_data_body(&mut self) -> Result<Expression, GrammarError> {
        if self.peek() == &Token::EntityLevel {
            self.advance();
            return self.parse_structured_data_prop();
        }

        let field_type = self.take_name("field type")?;
        self.expect(Token::PropertyLevel)?;

        if self.peek() == &Token::LBrace {
            return self.parse_object_props(field_type);
        }

        let prop_name = self.take_name("field type property name")?;
        let base = FieldTypeProp {
            field_type,
            prop_name,
        };
        if self.peek() != &Token::EntityLevel {
            return Ok(base.into());
        }
        let (referenced, referenced_prop_name) = self.parse_reference_chain()?;
        Ok(ReferenceFieldTypeProp {
            base,
            referenced,
            referenced_prop_name,
        }
        .into())
    }

    /// `␜␜{entity}␝{field}␞␟{prop}`
    fn parse_reference_chain(&mut self) -> Result<(ReferencedField, String), GrammarError> {
        self.expect(Token::EntityLevel)?;
        self.expect(Token::EntityLevel)?;
        let (entity_type, bundle) = self.take_entity()?;
        self.expect(Token::FieldLevel)?;
        let field_name = self.take_name("referenced field name")?;
        self.expect(Token::FieldItemLevel)?;
        if matches!(self.peek(), Token::Name(_)) {
            return Err(self.err("reference chains address every item; a delta is not allowed"));
        }
        self.expect(Token::PropertyLevel)?;
        let prop_name = self.take_name("referenced property name")?;
        Ok((
            ReferencedField {
                entity_type,
                bundle,
                field_name,
            },
            prop_name,
        ))
    }

    fn parse_object_props(&mut self, field_type: String) -> Result<Expression, GrammarError> {
        self.expect(Token::LBrace)?;
        let mut prop_map: Vec<(String, ObjectPropTarget)> = Vec::new();
        loop {
            let source = self.take_name("object property name")?;
            if prop_map.iter().any(|(name, _)| name == &source) {
                return Err(self.err(format!("object property '{}' is mapped twice", source)));
            }
            let target = match self.peek() {
                Token::UseProp => {
                    self.advance();
                    ObjectPropTarget::Prop(self.take_name("field type property name")?)
                }
                Token::FollowReference => {
                    self.advance();
                    let prop_name = self.take_name("field type property name")?;
                    let (referenced, referenced_prop_name) = self.parse_reference_chain()?;
                    ObjectPropTarget::FollowReference {
                        prop_name,
                        referenced,
                        referenced_prop_name,
                    }
                }
                other => {
                    return Err(self.err(format!(
                        "expected '↠' or '↝' after object property '{}', got {}",
                        source,
                        other.describe()
                    )))
                }
            };
            prop_map.push((source, target));

            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RBrace => {
                    self.advance();
                    break;
                }
                other => {
                    return Err(self.err(format!(
                        "expected ',' or '}}' in object property map, got {}",
                        other.describe()
                    )))
                }
            }
        }
        Ok(FieldTypeObjectProps {
            field_type,
            prop_map,
        }
        .into())
    }

    /// After the leading `␜`: `{entity}[␝{field}[␞[{delta}][␟{prop}]]]`
    fn parse_structured_data_prop(&mut self) -> Result<Expression, GrammarError> {
        let (entity_type, bundle) = self.take_entity()?;
        let mut expr = StructuredDataProp {
            entity_type,
            bundle,
            field: None,
        };
        if self.peek() != &Token::FieldLevel {
            return Ok(expr.into());
        }
        self.advance();
        let field_name = self.take_name("field name")?;
        let mut field = FieldItemPath {
            field_name,
            delta: None,
            prop_name: None,
        };
        if self.peek() == &Token::FieldItemLevel {
            self.advance();
            if matches!(self.peek(), Token::Name(_)) {
                field.delta = Some(self.take_delta()?);
            }
            if self.peek() == &Token::PropertyLevel {
                self.advance();
                field.prop_name = Some(self.take_name("field item property name")?);
            }
            if field.delta.is_none() && field.prop_name.is_none() {
                return Err(self.err("field item level needs a delta or a property name"));
            }
        }
        expr.field = Some(field);
        Ok(expr.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(input: &str) -> String {
        match parse(input) {
            Err(GrammarError::Malformed { reason, .. }) => reason,
            Ok(expr) => panic!("expected {:?} to be malformed, parsed {:?}", input, expr),
            Err(other) => panic!("expected a malformed error, got {:?}", other),
        }
    }

    #[test]
    fn parses_field_type_prop() {
        assert_eq!(
            parse("ℹ︎link␟url").unwrap(),
            FieldTypeProp::new("link", "url").unwrap().into()
        );
    }

    #[test]
    fn parses_reference_chain() {
        let expr = parse("ℹ︎image␟entity␜␜file␝uri␞␟url").unwrap();
        match expr {
            Expression::ReferenceFieldTypeProp(e) => {
                assert_eq!(e.base, FieldTypeProp::new("image", "entity").unwrap());
                assert_eq!(e.referenced_prop_path(), "file␝uri");
                assert_eq!(e.referenced_prop_name, "url");
            }
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn parses_object_props_with_follow_reference() {
        let expr =
            parse("ℹ︎image␟{src↝entity␜␜file␝uri␞␟url,alt↠alt,width↠width}").unwrap();
        let Expression::FieldTypeObjectProps(e) = expr else {
            panic!("expected object props");
        };
        assert_eq!(e.field_type, "image");
        let names: Vec<&str> = e.prop_map.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["src", "alt", "width"]);
        assert_eq!(e.target("alt"), Some(&ObjectPropTarget::Prop("alt".into())));
        assert!(matches!(
            e.target("src"),
            Some(ObjectPropTarget::FollowReference { prop_name, .. }) if prop_name == "entity"
        ));
    }

    #[test]
    fn parses_structured_data_levels() {
        let expr = parse("ℹ︎␜node:article␝field_tags␞2␟target_id").unwrap();
        let Expression::StructuredDataProp(e) = expr else {
            panic!("expected structured data prop");
        };
        assert_eq!(e.entity_type, "node");
        assert_eq!(e.bundle.as_deref(), Some("article"));
        assert_eq!(e.field_name(), Some("field_tags"));
        assert_eq!(e.delta(), Some(2));
        assert_eq!(e.prop_name(), Some("target_id"));
    }

    #[test]
    fn unknown_field_types_are_syntactically_fine() {
        assert!(parse("ℹ︎no_such_field_type␟whatever").is_ok());
        assert!(parse("ℹ︎␜no_such_entity").is_ok());
    }

    #[test]
    fn control_code_separators_parse_to_the_canonical_value() {
        let alt = parse("ℹ︎\u{001C}node\u{001D}title\u{001E}0␟value").unwrap();
        assert_eq!(alt.to_string(), "ℹ︎␜node␝title␞0␟value");
    }

    #[test]
    fn missing_marker() {
        malformed("link␟url");
        malformed("␜node␝title");
    }

    #[test]
    fn wrong_separator_order() {
        malformed("ℹ︎␜node␞0␝title");
        malformed("ℹ︎␜node␝title␟value␞0");
        malformed("ℹ︎link␝url");
        malformed("ℹ︎image␟entity␜file␝uri␞␟url");
    }

    #[test]
    fn empty_names() {
        malformed("ℹ︎string␟");
        malformed("ℹ︎␟value");
        malformed("⿲abc␟");
        malformed("ℹ︎␜node␝");
        malformed("ℹ︎␜:article");
        malformed("ℹ︎image␟{}");
    }

    #[test]
    fn non_canonical_structured_data() {
        assert!(malformed("ℹ︎␜node␝title␞").contains("delta or a property name"));
        malformed("ℹ︎␜node␝title␞01");
        malformed("ℹ︎␜node␝title␞-1");
        malformed("ℹ︎␜node␝title␞99999999999");
    }

    #[test]
    fn object_map_errors() {
        assert!(malformed("ℹ︎image␟{alt↠alt,alt↠title}").contains("mapped twice"));
        malformed("ℹ︎image␟{alt↠alt,}");
        malformed("ℹ︎image␟{alt↠alt");
        malformed("ℹ︎image␟{alt}");
        malformed("ℹ︎image␟{src↝entity␜␜file␝uri␞0␟url}");
    }

    #[test]
    fn trailing_input() {
        malformed("ℹ︎link␟url␟title");
        malformed("⿲abc␟title⿲");
        malformed("ℹ︎link␟url ");
    }

    #[test]
    fn colons_only_split_entity_and_bundle() {
        malformed("ℹ︎entity:node␟value");
        malformed("ℹ︎␜node:article:extra");
        malformed("ℹ︎␜node␝field:x");
    }
}
