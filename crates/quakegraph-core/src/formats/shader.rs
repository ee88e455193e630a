//! Shader script extraction.
//!
//! A script holds any number of `name { ... }` blocks. Only the directives that
//! name textures are interpreted: stage maps (`map`, `clampMap`, `animMap`,
//! `videoMap`) and `skyParms`.

use std::collections::BTreeMap;

use super::{sorted_unique, ExtractError, Extractor};

/// Sky box face suffixes, in engine order.
pub const SKY_SUFFIXES: [&str; 6] = ["_rt", "_lf", "_bk", "_ft", "_up", "_dn"];

/// Faces of the outer and inner sky boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkyBox {
    pub outer: Vec<String>,
    pub inner: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderStage {
    pub maps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefinition {
    pub name: String,
    pub stages: Vec<ShaderStage>,
    pub sky: Option<SkyBox>,
}

impl ShaderDefinition {
    /// Stage maps and sky faces, sorted and deduplicated.
    pub fn textures(&self) -> Vec<String> {
        let mut textures: Vec<String> = self
            .stages
            .iter()
            .flat_map(|s| s.maps.iter().cloned())
            .collect();
        if let Some(sky) = &self.sky {
            textures.extend(sky.outer.iter().cloned());
            textures.extend(sky.inner.iter().cloned());
        }
        sorted_unique(textures)
    }
}

/// All definitions of one script file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderScript {
    pub definitions: Vec<ShaderDefinition>,
}

impl ShaderScript {
    /// Names defined by this script, sorted and deduplicated.
    pub fn shader_names(&self) -> Vec<String> {
        sorted_unique(self.definitions.iter().map(|d| d.name.clone()).collect())
    }

    /// Shader name to texture list. Repeated names merge their textures.
    pub fn texture_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for def in &self.definitions {
            map.entry(def.name.clone())
                .or_default()
                .extend(def.textures());
        }
        map.into_iter()
            .map(|(name, textures)| (name, sorted_unique(textures)))
            .collect()
    }
}

/// Extractor for `.shader` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderExtractor;

impl Extractor for ShaderExtractor {
    type Output = ShaderScript;

    fn extract(&self, bytes: &[u8]) -> Result<ShaderScript, ExtractError> {
        parse_script(&String::from_utf8_lossy(bytes))
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    text: String,
    line: usize,
    quoted: bool,
}

impl Token {
    fn is(&self, s: &str) -> bool {
        !self.quoted && self.text == s
    }

    fn is_brace(&self) -> bool {
        self.is("{") || self.is("}")
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExtractError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '/' if chars.peek() == Some(&'/') => {
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let start = line;
                let mut prev = '\0';
                let mut closed = false;
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        line += 1;
                    }
                    if prev == '*' && ch == '/' {
                        closed = true;
                        break;
                    }
                    prev = ch;
                }
                if !closed {
                    return Err(ExtractError::syntax(start, "unterminated comment"));
                }
            }
            '"' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\n') | None => {
                            return Err(ExtractError::syntax(line, "unterminated string"))
                        }
                        Some(ch) => text.push(ch),
                    }
                }
                tokens.push(Token {
                    text,
                    line,
                    quoted: true,
                });
            }
            '{' | '}' => tokens.push(Token {
                text: c.to_string(),
                line,
                quoted: false,
            }),
            _ => {
                let mut text = c.to_string();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '{' || ch == '}' || ch == '"' {
                        break;
                    }
                    text.push(ch);
                    chars.next();
                }
                tokens.push(Token {
                    text,
                    line,
                    quoted: false,
                });
            }
        }
    }
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|t| t.line).unwrap_or(1)
    }

    /// Remaining tokens on the same line as `head`, stopping at braces.
    fn rest_of_line(&mut self, head: &Token) -> Vec<String> {
        let mut args = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            if token.line != head.line || token.is_brace() {
                break;
            }
            args.push(token.text.clone());
            self.pos += 1;
        }
        args
    }

    fn parse_definition(&mut self, name: Token) -> Result<ShaderDefinition, ExtractError> {
        match self.next() {
            Some(t) if t.is("{") => {}
            Some(t) => {
                return Err(ExtractError::syntax(
                    t.line,
                    format!("expected '{{' after shader {:?}", name.text),
                ))
            }
            None => return Err(ExtractError::syntax(name.line, "unexpected end of file")),
        }

        let mut def = ShaderDefinition {
            name: name.text,
            ..Default::default()
        };
        loop {
            let token = self
                .next()
                .ok_or_else(|| ExtractError::syntax(self.last_line(), "unterminated shader"))?;
            if token.is("}") {
                return Ok(def);
            }
            if token.is("{") {
                def.stages.push(self.parse_stage()?);
                continue;
            }
            let args = self.rest_of_line(&token);
            if token.text.eq_ignore_ascii_case("skyParms") {
                def.sky = Some(sky_box(&args));
            }
        }
    }

    fn parse_stage(&mut self) -> Result<ShaderStage, ExtractError> {
        let mut stage = ShaderStage::default();
        loop {
            let token = self
                .next()
                .ok_or_else(|| ExtractError::syntax(self.last_line(), "unterminated stage"))?;
            if token.is("}") {
                return Ok(stage);
            }
            if token.is("{") {
                return Err(ExtractError::syntax(token.line, "nested stage"));
            }
            let args = self.rest_of_line(&token);
            let directive = token.text.to_ascii_lowercase();
            let maps: &[String] = match directive.as_str() {
                "map" | "clampmap" | "videomap" => args.get(..1).unwrap_or(&[]),
                "animmap" => args.get(1..).unwrap_or(&[]),
                _ => &[],
            };
            stage.maps.extend(
                maps.iter()
                    .filter(|m| !m.starts_with('$'))
                    .cloned(),
            );
        }
    }
}

/// Parse script text into its shader definitions.
pub fn parse_script(text: &str) -> Result<ShaderScript, ExtractError> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
    };
    let mut definitions = Vec::new();
    while let Some(token) = parser.next() {
        if token.is_brace() {
            return Err(ExtractError::syntax(
                token.line,
                format!("unexpected {:?}", token.text),
            ));
        }
        definitions.push(parser.parse_definition(token)?);
    }
    Ok(ShaderScript { definitions })
}

/// `skyParms <outer> <cloud height> <inner>`; `-` means no box.
fn sky_box(args: &[String]) -> SkyBox {
    let faces = |base: Option<&String>| -> Vec<String> {
        match base {
            Some(b) if b != "-" => SKY_SUFFIXES.iter().map(|s| format!("{b}{s}")).collect(),
            _ => Vec::new(),
        }
    };
    SkyBox {
        outer: faces(args.first()),
        inner: faces(args.get(2)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCRIPT: &str = r#"
// player materials
player_skin
{
    cull none
    {
        map textures/player.tga
        rgbGen identity
    }
    {
        map $lightmap
        blendFunc filter
    }
}

textures/base/anim /* flickers */
{
    {
        animMap 4 textures/base/a1.tga textures/base/a2.tga
    }
    {
        clampMap "textures/base/glow.tga"
    }
}

textures/skies/space
{
    skyParms env/space 512 -
    surfaceparm sky
}
"#;

    #[test]
    fn test_parse_script() {
        let script = parse_script(SCRIPT).unwrap();
        assert_eq!(script.definitions.len(), 3);
        assert_eq!(
            script.shader_names(),
            vec!["player_skin", "textures/base/anim", "textures/skies/space"]
        );
        assert_eq!(script.definitions[0].stages.len(), 2);
    }

    #[test]
    fn test_texture_map() {
        let script = parse_script(SCRIPT).unwrap();
        let map = script.texture_map();
        assert_eq!(map["player_skin"], vec!["textures/player.tga"]);
        assert_eq!(
            map["textures/base/anim"],
            vec![
                "textures/base/a1.tga",
                "textures/base/a2.tga",
                "textures/base/glow.tga"
            ]
        );
        assert_eq!(
            map["textures/skies/space"],
            vec![
                "env/space_bk",
                "env/space_dn",
                "env/space_ft",
                "env/space_lf",
                "env/space_rt",
                "env/space_up"
            ]
        );
    }

    #[test]
    fn test_duplicate_definitions_merge() {
        let script = parse_script(
            "dup { { map a.tga } }\ndup { { map b.tga } { videoMap intro.roq } }",
        )
        .unwrap();
        assert_eq!(script.definitions.len(), 2);
        assert_eq!(
            script.texture_map()["dup"],
            vec!["a.tga", "b.tga", "intro.roq"]
        );
    }

    #[test]
    fn test_sky_box_inner() {
        let sky = sky_box(&["-".to_string(), "256".to_string(), "env/in".to_string()]);
        assert!(sky.outer.is_empty());
        assert_eq!(sky.inner.len(), 6);
        assert_eq!(sky.inner[0], "env/in_rt");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_script("a { { map x.tga }"),
            Err(ExtractError::Syntax { .. })
        ));
        assert!(matches!(
            parse_script("a map x"),
            Err(ExtractError::Syntax { .. })
        ));
        assert!(matches!(
            parse_script("}"),
            Err(ExtractError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_script("a { /* open"),
            Err(ExtractError::Syntax { .. })
        ));
    }

    #[test]
    fn test_empty_script() {
        let script = parse_script("// nothing here\n").unwrap();
        assert!(script.definitions.is_empty());
        assert!(script.texture_map().is_empty());
    }

    #[test]
    fn test_extractor_lossy_bytes() {
        let mut bytes = b"// ".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"\ns { { map t.tga } }");
        let script = ShaderExtractor.extract(&bytes).unwrap();
        assert_eq!(script.shader_names(), vec!["s"]);
    }
}
