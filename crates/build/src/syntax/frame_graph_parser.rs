use super::{Cursor, Lexer, ParseError, TokenKind};

/// Parses the frame graph ordering file into pass names, in execution order
///
/// Names are separated by whitespace, `,` or `;`.
pub fn parse_frame_graph(src: &str) -> Result<Vec<String>, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut cursor = Cursor::new(&tokens);

    let mut passes = Vec::new();
    while let Some(token) = cursor.peek() {
        match &token.kind {
            TokenKind::Ident(name) => passes.push(name.clone()),
            TokenKind::Symbol(',' | ';') => {}
            _ => return Err(cursor.error(format!("expected a pass name, found {}", cursor.describe_next()))),
        }
        cursor.next();
    }
    Ok(passes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let passes = parse_frame_graph("// order\nStatic, Dynamic;\nParticles\n  UI").unwrap();
        assert_eq!(passes, vec!["Static", "Dynamic", "Particles", "UI"]);
    }

    #[test]
    fn test_empty_file() {
        assert!(parse_frame_graph("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_garbage_reports_position() {
        let err = parse_frame_graph("Static\n  42").unwrap_err();
        assert_eq!((err.line, err.column), (2, 3));
    }
}
