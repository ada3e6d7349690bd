//! Resource argument templates
//!
//! A [`RootArg`] describes what to bind to one root signature parameter: an inline
//! constant buffer, or a descriptor table of constant buffers, textures and
//! samplers. Arguments are built by walking the root signature in order and
//! resolving every register against the pass's declared resources. Where an
//! argument ends up depends on the scope and bind frequency of its resources:
//!
//! | scope  | frequency | destination                                          |
//! |--------|-----------|------------------------------------------------------|
//! | Local  | PerObject | pass, per-object template                            |
//! | Local  | PerPass   | pass, per-pass arguments                             |
//! | Global | PerObject | frame graph template of the pass input type, by index |
//! | Global | PerPass   | frame graph shared pool, by index                    |
//!
//! Global arguments are deduplicated by structural equality, which includes the
//! root parameter index, so passes share a pool entry only when they bind the
//! same resources at the same root parameter.

use serde::Serialize;

use super::{CompileError, PerObjectGlobalTemplate};
use crate::hash::NameHash;
use crate::pass_source::{PassSource, Resource, ResourceContent, ResourceKind, RootParameter};
use crate::types::{ResourceBindFrequency, ResourceScope};

/// Handle of an allocated GPU buffer; templates leave it unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BufferHandle(pub u32);

/// Byte layout entry of a constant buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstBuffFieldLayout {
    pub name: String,
    pub hashed_name: NameHash,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DescTableEntity {
    ConstBuffView {
        hashed_name: NameHash,
        content: Vec<ConstBuffFieldLayout>,
        gpu_mem: Option<BufferHandle>,
        /// Descriptor heap slot, assigned when the view is allocated
        view_index: Option<u32>,
    },
    Texture {
        hashed_name: NameHash,
    },
    Sampler {
        hashed_name: NameHash,
    },
}

/// Binding template for one root signature parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RootArg {
    ConstBuffView {
        bind_index: u32,
        hashed_name: NameHash,
        content: Vec<ConstBuffFieldLayout>,
        gpu_mem: Option<BufferHandle>,
    },
    DescTable {
        bind_index: u32,
        content: Vec<DescTableEntity>,
    },
}

impl RootArg {
    /// Root parameter index this argument binds to
    pub fn bind_index(&self) -> u32 {
        match self {
            Self::ConstBuffView { bind_index, .. } | Self::DescTable { bind_index, .. } => *bind_index,
        }
    }
}

/// Resource arguments owned by or referenced from one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassRootArgs {
    pub per_object_local_root_args: Vec<RootArg>,
    pub pass_local_root_args: Vec<RootArg>,
    /// Indices into the frame graph's shared per-pass pool
    pub pass_global_root_args_indices: Vec<usize>,
    /// Indices into the per-object template of the pass input type
    pub per_object_global_root_args_indices: Vec<usize>,
}

/// Builds the resource arguments of one pass
///
/// # Arguments
/// * `pass` - Pass whose root signature is walked
/// * `pass_global_pool` - Shared pool of `[Global, PerPass]` arguments, extended as needed
/// * `per_object_template` - Per input type `[Global, PerObject]` arguments, extended as needed
pub fn build_root_args(pass: &PassSource, pass_global_pool: &mut Vec<RootArg>, per_object_template: &mut PerObjectGlobalTemplate) -> Result<PassRootArgs, CompileError> {
    let mut args = PassRootArgs::default();

    for (bind_index, param) in (0u32..).zip(&pass.root_signature.params) {
        let (arg, scope, bind_frequency) = match param {
            RootParameter::ConstBuffView { register_id } => {
                let resource = find(pass, ResourceKind::ConstBuff, *register_id)?;
                let arg = RootArg::ConstBuffView {
                    bind_index,
                    hashed_name: NameHash::of(&resource.name),
                    content: field_layout(resource),
                    gpu_mem: None,
                };
                (arg, resource.scope, resource.bind_frequency)
            }
            RootParameter::DescTable(entries) => {
                let mut content = Vec::new();
                let mut table_class: Option<(ResourceScope, ResourceBindFrequency)> = None;

                for entry in entries {
                    let end = entry.register_id.checked_add(entry.num).ok_or(CompileError::RegisterRangeOverflow {
                        bind_index,
                        register_id: entry.register_id,
                        num: entry.num,
                    })?;
                    for register_id in entry.register_id..end {
                        let resource = find(pass, entry.kind, register_id)?;
                        let class = (resource.scope, resource.bind_frequency);
                        match table_class {
                            None => table_class = Some(class),
                            Some(expected) if expected != class => {
                                return Err(CompileError::MixedDescTable {
                                    bind_index,
                                    resource: resource.name.clone(),
                                    expected,
                                    found: class,
                                });
                            }
                            Some(_) => {}
                        }
                        content.push(table_entity(resource));
                    }
                }

                let Some((scope, bind_frequency)) = table_class else {
                    continue;
                };
                (RootArg::DescTable { bind_index, content }, scope, bind_frequency)
            }
        };

        match (scope, bind_frequency) {
            (ResourceScope::Local, ResourceBindFrequency::PerObject) => args.per_object_local_root_args.push(arg),
            (ResourceScope::Local, ResourceBindFrequency::PerPass) => args.pass_local_root_args.push(arg),
            (ResourceScope::Global, ResourceBindFrequency::PerObject) => {
                let index = find_or_insert(&mut per_object_template[pass.input.index()], arg);
                args.per_object_global_root_args_indices.push(index);
            }
            (ResourceScope::Global, ResourceBindFrequency::PerPass) => {
                let index = find_or_insert(pass_global_pool, arg);
                args.pass_global_root_args_indices.push(index);
            }
        }
    }

    tracing::debug!(
        "Pass {} resource arguments: {} per-object local, {} per-pass local, {} global per-pass, {} global per-object",
        pass.name,
        args.per_object_local_root_args.len(),
        args.pass_local_root_args.len(),
        args.pass_global_root_args_indices.len(),
        args.per_object_global_root_args_indices.len()
    );

    Ok(args)
}

/// Resolves a register to exactly one declared resource
fn find(pass: &PassSource, kind: ResourceKind, register_id: u32) -> Result<&Resource, CompileError> {
    let mut matches = pass.resources_on(kind, register_id);
    match (matches.next(), matches.next()) {
        (Some(resource), None) => Ok(resource),
        (None, _) => Err(CompileError::MissingResource { kind, register_id }),
        (Some(_), Some(_)) => Err(CompileError::AmbiguousResource { kind, register_id }),
    }
}

fn field_layout(resource: &Resource) -> Vec<ConstBuffFieldLayout> {
    match &resource.content {
        ResourceContent::ConstBuff(fields) => fields
            .iter()
            .map(|f| ConstBuffFieldLayout {
                name: f.name.clone(),
                hashed_name: NameHash::of(&f.name),
                size: f.data_type.size(),
            })
            .collect(),
        ResourceContent::Texture | ResourceContent::Sampler => Vec::new(),
    }
}

fn table_entity(resource: &Resource) -> DescTableEntity {
    let hashed_name = NameHash::of(&resource.name);
    match &resource.content {
        ResourceContent::ConstBuff(_) => DescTableEntity::ConstBuffView {
            hashed_name,
            content: field_layout(resource),
            gpu_mem: None,
            view_index: None,
        },
        ResourceContent::Texture => DescTableEntity::Texture { hashed_name },
        ResourceContent::Sampler => DescTableEntity::Sampler { hashed_name },
    }
}

fn find_or_insert(args: &mut Vec<RootArg>, arg: RootArg) -> usize {
    if let Some(index) = args.iter().position(|existing| *existing == arg) {
        return index;
    }
    args.push(arg);
    args.len() - 1
}
