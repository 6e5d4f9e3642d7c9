//! Line oriented descriptors naming the imported types and the methods to leave out.

use crate::import::ImportError;
use crate::ty::PrimTy;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TYPE_NAME: Regex = Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$")
        .expect("Invalid type name pattern");
    static ref EXCLUSION: Regex = Regex::new(
        r"^([A-Za-z_$][\w$]*(?:[./][A-Za-z_$][\w$]*)*)::([A-Za-z_$<][\w$>]*)\(((?:\[*(?:[ZBSCIJFD]|L[A-Za-z_$][\w$]*(?:/[A-Za-z_$][\w$]*)*;))*)\)$"
    )
    .expect("Invalid exclusion pattern");
}

/// A method left out of the import, written `owner::name(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    /// Dotted name of the declaring type.
    pub owner: String,
    pub name: String,
    /// Argument descriptors without the parentheses, e.g. `I[JLjava/lang/String;`.
    pub args: String,
}

impl Exclusion {
    pub fn matches(&self, owner: &str, name: &str, signature: &str) -> bool {
        self.owner == owner && self.name == name && argument_part(signature) == Some(self.args.as_str())
    }
}

fn argument_part(signature: &str) -> Option<&str> {
    let start = signature.find('(')?;
    let end = signature.find(')')?;
    signature.get(start + 1..end)
}

fn meaningful_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// One fully qualified type name per line. Any malformed line rejects the whole list.
pub fn parse_type_list(text: &str) -> Result<Vec<String>, ImportError> {
    meaningful_lines(text)
        .map(|(line_number, line)| {
            if TYPE_NAME.is_match(line) {
                Ok(line.to_string())
            } else {
                Err(ImportError::MalformedTypeLine {
                    line_number,
                    line: line.to_string(),
                })
            }
        })
        .collect()
}

/// One `owner::name(args)` entry per line. Any malformed line rejects the whole list.
pub fn parse_exclusions(text: &str) -> Result<Vec<Exclusion>, ImportError> {
    meaningful_lines(text)
        .map(|(line_number, line)| {
            let captures =
                EXCLUSION
                    .captures(line)
                    .ok_or_else(|| ImportError::MalformedExclusionLine {
                        line_number,
                        line: line.to_string(),
                    })?;
            Ok(Exclusion {
                owner: captures[1].replace('/', "."),
                name: captures[2].to_string(),
                args: captures[3].to_string(),
            })
        })
        .collect()
}

/// Type appearing in a JVM descriptor, before class names are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorTy {
    Void,
    Prim(PrimTy),
    /// Dotted class name.
    Class(String),
    Array(Box<DescriptorTy>, usize),
}

/// Splits a method descriptor such as `(I[JLjava/lang/String;)V` into argument and return types.
pub fn parse_method_descriptor(
    signature: &str,
) -> Result<(Vec<DescriptorTy>, DescriptorTy), ImportError> {
    let malformed = || ImportError::MalformedSignature(signature.to_string());
    let rest = signature.strip_prefix('(').ok_or_else(malformed)?;
    let end = rest.find(')').ok_or_else(malformed)?;
    let (mut args_part, return_part) = (&rest[..end], &rest[end + 1..]);
    let mut args = vec![];
    while !args_part.is_empty() {
        let (ty, remaining) = parse_field_type(args_part).ok_or_else(malformed)?;
        if ty == DescriptorTy::Void {
            return Err(malformed());
        }
        args.push(ty);
        args_part = remaining;
    }
    let return_ty = match parse_field_type(return_part) {
        Some((ty, "")) => ty,
        _ => return Err(malformed()),
    };
    Ok((args, return_ty))
}

fn parse_field_type(text: &str) -> Option<(DescriptorTy, &str)> {
    let dims = text.chars().take_while(|c| *c == '[').count();
    let text = &text[dims..];
    let first = text.chars().next()?;
    let (ty, rest) = match first {
        'V' if dims == 0 => (DescriptorTy::Void, &text[1..]),
        'L' => {
            let end = text.find(';')?;
            let name = &text[1..end];
            if name.is_empty() {
                return None;
            }
            (DescriptorTy::Class(name.replace('/', ".")), &text[end + 1..])
        }
        code => (DescriptorTy::Prim(PrimTy::from_descriptor(code)?), &text[1..]),
    };
    if dims > 0 {
        Some((DescriptorTy::Array(Box::new(ty), dims), rest))
    } else {
        Some((ty, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_list_skips_blank_lines() {
        let names = parse_type_list("java.lang.Math\n\n  java.lang.Integer  \n").unwrap();
        assert_eq!(names, vec!["java.lang.Math", "java.lang.Integer"]);
    }

    #[test]
    fn malformed_type_line_aborts() {
        let err = parse_type_list("java.lang.Math\njava..Integer\n").unwrap_err();
        assert!(matches!(
            err,
            ImportError::MalformedTypeLine { line_number: 2, .. }
        ));
    }

    #[test]
    fn exclusion_lines() {
        let exclusions =
            parse_exclusions("java/lang/Math::max(II)\njava.lang.String::valueOf([CLjava/lang/Object;)")
                .unwrap();
        assert_eq!(exclusions[0].owner, "java.lang.Math");
        assert_eq!(exclusions[0].name, "max");
        assert!(exclusions[0].matches("java.lang.Math", "max", "(II)I"));
        assert!(!exclusions[0].matches("java.lang.Math", "max", "(JJ)J"));
        assert_eq!(exclusions[1].args, "[CLjava/lang/Object;");
    }

    #[test]
    fn malformed_exclusion_aborts() {
        for line in ["java.lang.Math::max(Q)", "java.lang.Math.max(I)", "::max(I)", "java.lang.Math::max(I"] {
            assert!(
                matches!(
                    parse_exclusions(line),
                    Err(ImportError::MalformedExclusionLine { line_number: 1, .. })
                ),
                "{}",
                line
            );
        }
    }

    #[test]
    fn method_descriptors() {
        let (args, ret) = parse_method_descriptor("(I[[JLjava/lang/String;)V").unwrap();
        assert_eq!(
            args,
            vec![
                DescriptorTy::Prim(PrimTy::Int),
                DescriptorTy::Array(Box::new(DescriptorTy::Prim(PrimTy::Long)), 2),
                DescriptorTy::Class("java.lang.String".to_string()),
            ]
        );
        assert_eq!(ret, DescriptorTy::Void);
        assert!(parse_method_descriptor("(V)I").is_err());
        assert!(parse_method_descriptor("(I)").is_err());
        assert!(parse_method_descriptor("(Ljava/lang/String)I").is_err());
    }
}
