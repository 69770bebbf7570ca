use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Execution backend family a variant belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Backend {
    Seq,
    OpenMp,
    OpenMpTarget,
    Cuda,
    Hip,
}

impl Backend {
    /// Backends whose kernels run as launches against device memory
    pub fn is_device(&self) -> bool {
        matches!(self, Backend::OpenMpTarget | Backend::Cuda | Backend::Hip)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Seq => "Seq",
            Backend::OpenMp => "OpenMP",
            Backend::OpenMpTarget => "OMPTarget",
            Backend::Cuda => "CUDA",
            Backend::Hip => "HIP",
        }
    }
}

/// How the kernel body is expressed inside a backend.
///
/// `Base` is a hand-written loop, `Lambda` invokes the body as a closure from a
/// hand-written loop, `Portable` goes through the generic policy launcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Flavor {
    Base,
    Lambda,
    Portable,
}

impl Flavor {
    pub fn name(&self) -> &'static str {
        match self {
            Flavor::Base => "Base",
            Flavor::Lambda => "Lambda",
            Flavor::Portable => "Portable",
        }
    }
}

/// Closed set of kernel variants known at build time. Serialized with the
/// report names, the same spelling `FromStr` accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariantId {
    #[serde(rename = "Base_Seq")]
    BaseSeq,
    #[serde(rename = "Lambda_Seq")]
    LambdaSeq,
    #[serde(rename = "Portable_Seq")]
    PortableSeq,
    #[serde(rename = "Base_OpenMP")]
    BaseOpenMp,
    #[serde(rename = "Lambda_OpenMP")]
    LambdaOpenMp,
    #[serde(rename = "Portable_OpenMP")]
    PortableOpenMp,
    #[serde(rename = "Base_OMPTarget")]
    BaseOpenMpTarget,
    #[serde(rename = "Portable_OMPTarget")]
    PortableOpenMpTarget,
    #[serde(rename = "Base_CUDA")]
    BaseCuda,
    #[serde(rename = "Lambda_CUDA")]
    LambdaCuda,
    #[serde(rename = "Portable_CUDA")]
    PortableCuda,
    #[serde(rename = "Base_HIP")]
    BaseHip,
    #[serde(rename = "Lambda_HIP")]
    LambdaHip,
    #[serde(rename = "Portable_HIP")]
    PortableHip,
}

/// Every variant, in reporting order.
pub const ALL_VARIANTS: [VariantId; 14] = [
    VariantId::BaseSeq,
    VariantId::LambdaSeq,
    VariantId::PortableSeq,
    VariantId::BaseOpenMp,
    VariantId::LambdaOpenMp,
    VariantId::PortableOpenMp,
    VariantId::BaseOpenMpTarget,
    VariantId::PortableOpenMpTarget,
    VariantId::BaseCuda,
    VariantId::LambdaCuda,
    VariantId::PortableCuda,
    VariantId::BaseHip,
    VariantId::LambdaHip,
    VariantId::PortableHip,
];

impl VariantId {
    pub fn backend(&self) -> Backend {
        use VariantId::*;
        match self {
            BaseSeq | LambdaSeq | PortableSeq => Backend::Seq,
            BaseOpenMp | LambdaOpenMp | PortableOpenMp => Backend::OpenMp,
            BaseOpenMpTarget | PortableOpenMpTarget => Backend::OpenMpTarget,
            BaseCuda | LambdaCuda | PortableCuda => Backend::Cuda,
            BaseHip | LambdaHip | PortableHip => Backend::Hip,
        }
    }

    pub fn flavor(&self) -> Flavor {
        use VariantId::*;
        match self {
            BaseSeq | BaseOpenMp | BaseOpenMpTarget | BaseCuda | BaseHip => Flavor::Base,
            LambdaSeq | LambdaOpenMp | LambdaCuda | LambdaHip => Flavor::Lambda,
            PortableSeq | PortableOpenMp | PortableOpenMpTarget | PortableCuda | PortableHip => {
                Flavor::Portable
            }
        }
    }

    /// Report name, e.g. `Base_Seq` or `Portable_CUDA`
    pub fn name(&self) -> &'static str {
        use VariantId::*;
        match self {
            BaseSeq => "Base_Seq",
            LambdaSeq => "Lambda_Seq",
            PortableSeq => "Portable_Seq",
            BaseOpenMp => "Base_OpenMP",
            LambdaOpenMp => "Lambda_OpenMP",
            PortableOpenMp => "Portable_OpenMP",
            BaseOpenMpTarget => "Base_OMPTarget",
            PortableOpenMpTarget => "Portable_OMPTarget",
            BaseCuda => "Base_CUDA",
            LambdaCuda => "Lambda_CUDA",
            PortableCuda => "Portable_CUDA",
            BaseHip => "Base_HIP",
            LambdaHip => "Lambda_HIP",
            PortableHip => "Portable_HIP",
        }
    }

    /// Variants of every backend except `Lambda` device flavours
    pub fn without_device_lambdas() -> impl Iterator<Item = VariantId> {
        ALL_VARIANTS
            .into_iter()
            .filter(|v| !(v.backend().is_device() && v.flavor() == Flavor::Lambda))
    }
}

impl Display for VariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for VariantId {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_VARIANTS
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| KernelError::InvalidParams(format!("unknown variant name `{s}`")))
    }
}
