//! Cross-pass resource validation
//!
//! Resources are grouped into buckets by scope and bind frequency:
//!
//! - every pass is its own namespace; a name may appear only once per pass
//! - `[Global, PerPass]` resources share one namespace across all passes
//! - `[Global, PerObject]` resources share one namespace per pass input type
//!
//! Within a global bucket a repeated name must carry identical content. A name in
//! a global bucket may not be reused by a resource of a different bucket, except
//! that per-object buckets of different input types never see each other.
//!
//! The checks are order independent: all global buckets are collected first,
//! then every resource is checked against them.

use std::collections::{HashMap, HashSet};

use crate::pass_source::{PassSource, Resource};
use crate::types::{PassInputType, ResourceBindFrequency, ResourceScope};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("pass '{pass}' declares resource '{resource}' more than once")]
    LocalCollision { pass: String, resource: String },
    #[error("global resource '{resource}' of pass '{pass}' differs from its declaration in pass '{first_pass}'")]
    GlobalContentMismatch { pass: String, first_pass: String, resource: String },
    #[error("resource '{resource}' of pass '{pass}' collides with the global {bucket} resource of pass '{other_pass}'")]
    BucketCollision {
        pass: String,
        other_pass: String,
        resource: String,
        bucket: &'static str,
    },
}

/// First declaration of each name in a global bucket
type Bucket<'a> = HashMap<&'a str, (&'a str, &'a Resource)>;

/// Checks resource names and content across all passes
///
/// # Arguments
/// * `passes` - All lowered passes of a rebuild
///
/// # Returns
/// * `Ok(())` - No collisions
/// * `Err(ValidationError)` - The first collision found
pub fn validate_resources(passes: &[PassSource]) -> Result<(), ValidationError> {
    let mut per_pass_global: Bucket = HashMap::new();
    let mut per_object_global: [Bucket; PassInputType::COUNT] = Default::default();

    for pass in passes {
        let mut local_names = HashSet::new();
        for resource in &pass.resources {
            if !local_names.insert(resource.name.as_str()) {
                return Err(ValidationError::LocalCollision {
                    pass: pass.name.clone(),
                    resource: resource.name.clone(),
                });
            }

            let bucket = match (resource.scope, resource.bind_frequency) {
                (ResourceScope::Global, ResourceBindFrequency::PerPass) => &mut per_pass_global,
                (ResourceScope::Global, ResourceBindFrequency::PerObject) => &mut per_object_global[pass.input.index()],
                (ResourceScope::Local, _) => continue,
            };
            unify(bucket, pass, resource)?;
        }
    }

    for pass in passes {
        let same_input_objects = &per_object_global[pass.input.index()];
        for resource in &pass.resources {
            let is_global = resource.scope == ResourceScope::Global;

            if !(is_global && resource.bind_frequency == ResourceBindFrequency::PerPass) {
                if let Some((other_pass, _)) = per_pass_global.get(resource.name.as_str()) {
                    return Err(collision(pass, other_pass, resource, "per-pass"));
                }
            }

            match resource.bind_frequency {
                ResourceBindFrequency::PerPass => {
                    if let Some((other_pass, _)) = per_object_global.iter().find_map(|bucket| bucket.get(resource.name.as_str())) {
                        return Err(collision(pass, other_pass, resource, "per-object"));
                    }
                }
                ResourceBindFrequency::PerObject if !is_global => {
                    if let Some((other_pass, _)) = same_input_objects.get(resource.name.as_str()) {
                        return Err(collision(pass, other_pass, resource, "per-object"));
                    }
                }
                ResourceBindFrequency::PerObject => {}
            }
        }
    }

    tracing::debug!("Resource validation passed for {} pass(es)", passes.len());
    Ok(())
}

fn unify<'a>(bucket: &mut Bucket<'a>, pass: &'a PassSource, resource: &'a Resource) -> Result<(), ValidationError> {
    match bucket.get(resource.name.as_str()) {
        Some((first_pass, first)) if !first.same_content(resource) => Err(ValidationError::GlobalContentMismatch {
            pass: pass.name.clone(),
            first_pass: first_pass.to_string(),
            resource: resource.name.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            bucket.insert(resource.name.as_str(), (pass.name.as_str(), resource));
            Ok(())
        }
    }
}

fn collision(pass: &PassSource, other_pass: &str, resource: &Resource, bucket: &'static str) -> ValidationError {
    ValidationError::BucketCollision {
        pass: pass.name.clone(),
        other_pass: other_pass.to_string(),
        resource: resource.name.clone(),
        bucket,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::DrawArea;

    fn pass(name: &str, input: &str, defs: &str) -> PassSource {
        let src = format!("PassInput : {input}\nPassVertAttr : V\nRootSig <[ ]>\nShaderDefs {{ {defs} }}\nShader VS <[ ]>");
        PassSource::parse(name, name, &src, DrawArea::default()).unwrap()
    }

    const FRAME: &str = "[Global, PerPass] cbuffer FrameConstants : register(b0) { float4x4 viewProj; float time; };";

    #[test]
    fn test_identical_globals_unify() {
        let passes = vec![pass("A", "Static", FRAME), pass("B", "Dynamic", FRAME)];
        assert_eq!(validate_resources(&passes), Ok(()));
    }

    #[test]
    fn test_global_content_mismatch() {
        let other = "[Global, PerPass] cbuffer FrameConstants : register(b0) { float4x4 viewProj; };";
        let passes = vec![pass("A", "Static", FRAME), pass("B", "Static", other)];
        assert_eq!(
            validate_resources(&passes),
            Err(ValidationError::GlobalContentMismatch {
                pass: "B".to_string(),
                first_pass: "A".to_string(),
                resource: "FrameConstants".to_string(),
            })
        );
    }

    #[test]
    fn test_local_collision() {
        let defs = "[Local, PerPass] Texture2D X : register(t0); [Local, PerObject] SamplerState X : register(s0);";
        let passes = vec![pass("A", "UI", defs)];
        assert!(matches!(validate_resources(&passes), Err(ValidationError::LocalCollision { .. })));
    }

    #[test]
    fn test_per_object_globals_are_scoped_by_input_type() {
        let dynamic = pass("A", "Dynamic", "[Global, PerObject] cbuffer X : register(b1) { float4x4 world; };");
        let ui = pass("B", "UI", "[Global, PerObject] cbuffer X : register(b1) { float2 offset; };");
        assert_eq!(validate_resources(&[dynamic, ui]), Ok(()));
    }

    #[test]
    fn test_per_object_global_mismatch_within_input_type() {
        let a = pass("A", "Dynamic", "[Global, PerObject] cbuffer X : register(b1) { float4x4 world; };");
        let b = pass("B", "Dynamic", "[Global, PerObject] cbuffer X : register(b1) { float2 offset; };");
        assert!(matches!(validate_resources(&[a, b]), Err(ValidationError::GlobalContentMismatch { .. })));
    }

    #[test]
    fn test_local_name_shadowing_global_per_pass() {
        let a = pass("A", "Static", FRAME);
        let b = pass("B", "Static", "[Local, PerPass] cbuffer FrameConstants : register(b0) { float time; };");
        let expected = Err(ValidationError::BucketCollision {
            pass: "B".to_string(),
            other_pass: "A".to_string(),
            resource: "FrameConstants".to_string(),
            bucket: "per-pass",
        });
        assert_eq!(validate_resources(&[a.clone(), b.clone()]), expected);
        assert_eq!(validate_resources(&[b, a]), expected);
    }

    #[test]
    fn test_per_pass_name_collides_with_any_per_object_global() {
        let a = pass("A", "Particles", "[Global, PerObject] Texture2D Sprite : register(t0);");
        let b = pass("B", "UI", "[Local, PerPass] Texture2D Sprite : register(t0);");
        assert!(matches!(validate_resources(&[a, b]), Err(ValidationError::BucketCollision { bucket: "per-object", .. })));
    }

    #[test]
    fn test_local_per_object_collides_only_within_input_type() {
        let global = pass("A", "Static", "[Global, PerObject] Texture2D Albedo : register(t0);");
        let same_input = pass("B", "Static", "[Local, PerObject] Texture2D Albedo : register(t0);");
        let other_input = pass("C", "Dynamic", "[Local, PerObject] Texture2D Albedo : register(t0);");

        assert!(validate_resources(&[global.clone(), same_input]).is_err());
        assert_eq!(validate_resources(&[global, other_input]), Ok(()));
    }
}
