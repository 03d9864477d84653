//! Strongly-typed models for PLCopen TC6 projects and IEC 61499 Basic FBs.
//!
//! All types are plain value trees: no back-references, no shared ownership.
//! A parse produces a fresh tree; editors replace the whole tree on re-parse.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// PLCopen project
// ────────────────────────────────────────────────────────────────────────────

/// Root of a PLCopen TC6 XML document.
///
/// POU names are expected to be unique but this is not enforced; lookups
/// through [`PlcopenProject::pou`] return the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date_time: Option<String>,
    #[serde(default)]
    pub data_types: Vec<PlcopenDataType>,
    #[serde(default)]
    pub pous: Vec<PlcopenPou>,
    #[serde(default)]
    pub configurations: Vec<PlcopenConfiguration>,
}

impl PlcopenProject {
    /// First POU with the given name.
    pub fn pou(&self, name: &str) -> Option<&PlcopenPou> {
        self.pous.iter().find(|p| p.name == name)
    }
}

/// A user-defined type from `types/dataTypes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenDataType {
    pub name: String,
    /// Textual type expression; `"STRUCT"` or `"ENUM"` for structured bodies.
    pub base_type: String,
    #[serde(default)]
    pub members: Vec<PlcopenVarDeclaration>,
    #[serde(default)]
    pub enum_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// POU
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PouType {
    Program,
    FunctionBlock,
    Function,
    #[default]
    Unknown,
}

impl PouType {
    /// Case-insensitive match of a `pouType` attribute value.
    pub fn from_attr(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "program" => PouType::Program,
            "functionblock" => PouType::FunctionBlock,
            "function" => PouType::Function,
            _ => PouType::Unknown,
        }
    }

    /// Attribute spelling used by PLCopen; `None` for [`PouType::Unknown`].
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            PouType::Program => Some("program"),
            PouType::FunctionBlock => Some("functionBlock"),
            PouType::Function => Some("function"),
            PouType::Unknown => None,
        }
    }
}

/// Program organization unit: a program, function block or function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenPou {
    pub name: String,
    #[serde(default)]
    pub pou_type: PouType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub interface: PlcopenPouInterface,
    #[serde(default)]
    pub body: PlcopenPouBody,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenVarDeclaration {
    pub name: String,
    /// Textual IEC type, e.g. `"INT"` or `"ARRAY[1..10] OF INT"`.
    #[serde(rename = "type")]
    pub var_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
}

/// Variable sections of a POU interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenPouInterface {
    #[serde(default)]
    pub inputs: Vec<PlcopenVarDeclaration>,
    #[serde(default)]
    pub outputs: Vec<PlcopenVarDeclaration>,
    #[serde(default)]
    pub in_outs: Vec<PlcopenVarDeclaration>,
    #[serde(default)]
    pub locals: Vec<PlcopenVarDeclaration>,
    #[serde(default)]
    pub temps: Vec<PlcopenVarDeclaration>,
    #[serde(default)]
    pub externals: Vec<PlcopenVarDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

/// Identifies one of the six interface sections by its XML tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarSection {
    Inputs,
    Outputs,
    InOuts,
    Locals,
    Temps,
    Externals,
}

impl VarSection {
    /// Sections in PLCopen schema order.
    pub const ALL: [VarSection; 6] = [
        VarSection::Inputs,
        VarSection::Outputs,
        VarSection::InOuts,
        VarSection::Externals,
        VarSection::Locals,
        VarSection::Temps,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            VarSection::Inputs => "inputVars",
            VarSection::Outputs => "outputVars",
            VarSection::InOuts => "inOutVars",
            VarSection::Locals => "localVars",
            VarSection::Temps => "tempVars",
            VarSection::Externals => "externalVars",
        }
    }
}

impl PlcopenPouInterface {
    pub fn section(&self, section: VarSection) -> &[PlcopenVarDeclaration] {
        match section {
            VarSection::Inputs => &self.inputs,
            VarSection::Outputs => &self.outputs,
            VarSection::InOuts => &self.in_outs,
            VarSection::Locals => &self.locals,
            VarSection::Temps => &self.temps,
            VarSection::Externals => &self.externals,
        }
    }

    pub fn section_mut(&mut self, section: VarSection) -> &mut Vec<PlcopenVarDeclaration> {
        match section {
            VarSection::Inputs => &mut self.inputs,
            VarSection::Outputs => &mut self.outputs,
            VarSection::InOuts => &mut self.in_outs,
            VarSection::Locals => &mut self.locals,
            VarSection::Temps => &mut self.temps,
            VarSection::Externals => &mut self.externals,
        }
    }
}

/// POU body. The representations are not mutually exclusive in the model,
/// even though real POUs normally populate exactly one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenPouBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub st: Option<PlcopenStBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub il: Option<PlcopenIlBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sfc: Option<PlcopenSfcNetwork>,
    #[serde(default)]
    pub ld: Vec<PlcopenLdNetwork>,
    #[serde(default)]
    pub fbd: Vec<PlcopenFbdNetwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlcopenStBody {
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlcopenIlBody {
    pub code: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlcopenPosition {
    pub x: f64,
    pub y: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Ladder diagram
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenLdNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rungs: Vec<PlcopenLdRung>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlcopenLdRung {
    pub elements: Vec<PlcopenLdElement>,
}

/// A ladder element tagged by its XML element name (`contact`, `coil`,
/// `leftPowerRail`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenLdElement {
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default)]
    pub negated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PlcopenPosition>,
    /// `refLocalId`s of the element's incoming connections.
    #[serde(default)]
    pub ref_local_ids: Vec<u32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Function block diagram
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenFbdNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub blocks: Vec<PlcopenFbdBlock>,
    pub connections: Vec<PlcopenFbdConnection>,
    pub variables: Vec<PlcopenFbdVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenFbdBlock {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PlcopenPosition>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub in_outs: Vec<String>,
}

/// A directed edge from the element with `ref_local_id` into the pin named
/// `formal_parameter`. Edges are kept flat; resolving them into a graph is
/// left to presenters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenFbdConnection {
    pub ref_local_id: u32,
    pub formal_parameter: String,
    /// Block or variable that owns the target pin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_local_id: Option<u32>,
    /// Output pin on the source block, when the source has several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_parameter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FbdVariableRole {
    #[default]
    In,
    Out,
    InOut,
}

impl FbdVariableRole {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "inVariable" => Some(FbdVariableRole::In),
            "outVariable" => Some(FbdVariableRole::Out),
            "inOutVariable" => Some(FbdVariableRole::InOut),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            FbdVariableRole::In => "inVariable",
            FbdVariableRole::Out => "outVariable",
            FbdVariableRole::InOut => "inOutVariable",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenFbdVariable {
    pub role: FbdVariableRole,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<u32>,
    #[serde(default)]
    pub negated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PlcopenPosition>,
}

// ────────────────────────────────────────────────────────────────────────────
// Sequential function chart
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlcopenSfcNetwork {
    pub steps: Vec<PlcopenSfcStep>,
    pub transitions: Vec<PlcopenSfcTransition>,
    pub actions: Vec<PlcopenSfcAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenSfcStep {
    pub name: String,
    #[serde(default)]
    pub initial: bool,
    /// Names of the actions attached to this step through action blocks.
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PlcopenPosition>,
}

/// A transition between step sets. Several `from` entries model a
/// convergence, several `to` entries a divergence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenSfcTransition {
    pub from: Vec<String>,
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlcopenSfcAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Configurations
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenConfiguration {
    pub name: String,
    #[serde(default)]
    pub resources: Vec<PlcopenResource>,
    #[serde(default)]
    pub global_vars: Vec<PlcopenVarDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenResource {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<PlcopenTask>,
    /// Instances declared directly under the resource, not bound to a task.
    #[serde(default)]
    pub pou_instances: Vec<PlcopenPouInstance>,
    #[serde(default)]
    pub global_vars: Vec<PlcopenVarDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenTask {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub pou_instances: Vec<PlcopenPouInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlcopenPouInstance {
    pub name: String,
    pub type_name: String,
}

// ────────────────────────────────────────────────────────────────────────────
// IEC 61499 Basic Function Block
// ────────────────────────────────────────────────────────────────────────────

/// A Basic FB read from an `.fbt` file.
///
/// `vars[i].used_by_events` mirrors `events[j].associated_vars`: every event
/// name listed on a variable names an event whose `associated_vars` contains
/// that variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbtBasicFb {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub events: Vec<FbtEvent>,
    pub vars: Vec<FbtVar>,
    #[serde(default)]
    pub internal_vars: Vec<FbtVar>,
    /// Absent when the chart has neither states nor transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecc: Option<FbtEcc>,
    pub algorithms: Vec<FbtAlgorithm>,
}

impl FbtBasicFb {
    pub fn event(&self, name: &str) -> Option<&FbtEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn var(&self, name: &str) -> Option<&FbtVar> {
        self.vars.iter().find(|v| v.name == name)
    }

    pub fn algorithm(&self, name: &str) -> Option<&FbtAlgorithm> {
        self.algorithms.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FbtDirection {
    #[default]
    Input,
    Output,
    Internal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbtEvent {
    pub name: String,
    pub direction: FbtDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Data variables sampled or emitted with this event (`<With Var=…/>`).
    pub associated_vars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbtVar {
    pub name: String,
    pub direction: FbtDirection,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<String>,
    /// `ArraySize` attribute, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Events whose `With` list names this variable. Derived, not in the XML.
    pub used_by_events: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FbtEcc {
    pub states: Vec<FbtEccState>,
    pub transitions: Vec<FbtEccTransition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FbtEccState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    pub actions: Vec<FbtEccAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FbtEccAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FbtEccTransition {
    pub source: String,
    pub destination: String,
    /// Guard expression; empty when the XML carries none.
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FbtAlgorithmLanguage {
    #[serde(rename = "ST")]
    St,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FbtAlgorithm {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub language: FbtAlgorithmLanguage,
    pub body: String,
    /// States whose actions run this algorithm. Only computed when the block
    /// has both algorithms and ECC states.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_in_states: Option<Vec<String>>,
}
