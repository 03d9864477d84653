use plcforge::model::{FbdVariableRole, PouType};
use plcforge::parser::plcopen::DEFAULT_POU_NAME;
use plcforge::{ParseFailure, ParserLimits, parse_plcopen_project, try_parse_plcopen_project};

const MINIMAL_PROGRAM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://www.plcopen.org/xml/tc6_0201">
  <fileHeader companyName="ACME" productName="Line 4" productVersion="1.2" creationDateTime="2024-01-02T03:04:05"/>
  <contentHeader name="Demo"/>
  <types>
    <dataTypes/>
    <pous>
      <pou name="Main" pouType="program">
        <interface>
          <inputVars>
            <variable name="X"><type><BOOL/></type></variable>
          </inputVars>
        </interface>
        <body>
          <ST><xhtml xmlns="http://www.w3.org/1999/xhtml">Y := X;</xhtml></ST>
        </body>
      </pou>
    </pous>
  </types>
  <instances><configurations/></instances>
</project>
"#;

#[test]
fn minimal_program_with_st_body() {
    let project = parse_plcopen_project(MINIMAL_PROGRAM).expect("project");
    assert_eq!(project.name.as_deref(), Some("Demo"));
    assert_eq!(project.company_name.as_deref(), Some("ACME"));
    assert_eq!(project.product_version.as_deref(), Some("1.2"));
    assert_eq!(project.creation_date_time.as_deref(), Some("2024-01-02T03:04:05"));

    let pou = &project.pous[0];
    assert_eq!(pou.name, "Main");
    assert_eq!(pou.pou_type, PouType::Program);
    assert_eq!(pou.interface.inputs[0].name, "X");
    assert_eq!(pou.interface.inputs[0].var_type, "BOOL");
    assert_eq!(pou.body.st.as_ref().map(|b| b.code.as_str()), Some("Y := X;"));
    assert!(pou.body.ld.is_empty());
    assert!(pou.body.sfc.is_none());
}

#[test]
fn empty_and_whitespace_input_yield_none() {
    assert!(parse_plcopen_project("").is_none());
    assert!(parse_plcopen_project("   \n\t").is_none());
}

#[test]
fn malformed_xml_yields_none() {
    assert!(parse_plcopen_project("<not-xml").is_none());
    let err = try_parse_plcopen_project("<not-xml", &ParserLimits::default()).unwrap_err();
    assert!(matches!(err, ParseFailure::MalformedXml(_)));
}

#[test]
fn wrong_root_yields_none() {
    assert!(parse_plcopen_project("<foo/>").is_none());
    let err = try_parse_plcopen_project("<FBType/>", &ParserLimits::default()).unwrap_err();
    match err {
        ParseFailure::MissingRoot { expected, found } => {
            assert_eq!(expected, "project");
            assert_eq!(found, "FBType");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn unnamed_pou_gets_default_name() {
    let xml = r#"<project><types><pous><pou pouType="program"/></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    assert_eq!(project.pous[0].name, DEFAULT_POU_NAME);
    assert_eq!(project.pous[0].name, "UnnamedPOU");
}

#[test]
fn bare_project_has_empty_collections() {
    let project = parse_plcopen_project("<project/>").expect("project");
    assert!(project.name.is_none());
    assert!(project.pous.is_empty());
    assert!(project.data_types.is_empty());
    assert!(project.configurations.is_empty());
}

#[test]
fn interface_sections_types_and_initial_values() {
    let xml = r#"<project><types><pous>
  <pou name="FB1" pouType="functionBlock">
    <interface>
      <returnType><derived name="MyStruct"/></returnType>
      <inputVars>
        <variable name="Arr">
          <type>
            <array>
              <dimension lower="1" upper="10"/>
              <baseType><INT/></baseType>
            </array>
          </type>
        </variable>
        <variable><type><BOOL/></type></variable>
      </inputVars>
      <localVars>
        <variable name="Count" address="%MW10">
          <type><DINT/></type>
          <initialValue><simpleValue value="42"/></initialValue>
          <documentation><xhtml xmlns="http://www.w3.org/1999/xhtml">cycle counter</xhtml></documentation>
        </variable>
      </localVars>
      <localVars constant="true">
        <variable name="Limit"><type><DINT/></type></variable>
      </localVars>
      <tempVars><variable name="Tmp"/></tempVars>
      <externalVars><variable name="G"><type><derived name="GlobalT"/></type></variable></externalVars>
      <inOutVars><variable name="Buf"><type><STRING/></type></variable></inOutVars>
    </interface>
  </pou>
</pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let iface = &project.pous[0].interface;
    assert_eq!(project.pous[0].pou_type, PouType::FunctionBlock);
    assert_eq!(iface.return_type.as_deref(), Some("MyStruct"));
    assert_eq!(iface.inputs.len(), 1, "unnamed variable is skipped");
    assert_eq!(iface.inputs[0].var_type, "ARRAY[1..10] OF INT");
    let names: Vec<_> = iface.locals.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["Count", "Limit"]);
    assert_eq!(iface.locals[0].address.as_deref(), Some("%MW10"));
    assert_eq!(iface.locals[0].initial_value.as_deref(), Some("42"));
    assert_eq!(iface.locals[0].comment.as_deref(), Some("cycle counter"));
    assert_eq!(iface.temps[0].var_type, "UNKNOWN");
    assert_eq!(iface.externals[0].var_type, "GlobalT");
    assert_eq!(iface.in_outs[0].var_type, "STRING");
}

#[test]
fn nested_and_multi_dimension_arrays() {
    let xml = r#"<project><types><pous><pou name="P" pouType="program"><interface><localVars>
  <variable name="M">
    <type><array>
      <dimension lower="1" upper="2"/>
      <dimension lower="1" upper="3"/>
      <baseType><REAL/></baseType>
    </array></type>
  </variable>
  <variable name="N">
    <type><array>
      <dimension lower="0" upper="4"/>
      <baseType><array><dimension lower="1" upper="8"/><baseType><BYTE/></baseType></array></baseType>
    </array></type>
  </variable>
</localVars></interface></pou></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let locals = &project.pous[0].interface.locals;
    assert_eq!(locals[0].var_type, "ARRAY[1..2, 1..3] OF REAL");
    assert_eq!(locals[1].var_type, "ARRAY[0..4] OF ARRAY[1..8] OF BYTE");
}

#[test]
fn type_nesting_beyond_limit_fails_closed() {
    let mut ty = String::from("<INT/>");
    for _ in 0..6 {
        ty = format!("<array><dimension lower=\"0\" upper=\"1\"/><baseType>{ty}</baseType></array>");
    }
    let xml = format!(
        "<project><types><pous><pou name=\"P\"><interface><localVars><variable name=\"V\"><type>{ty}</type></variable></localVars></interface></pou></pous></types></project>"
    );
    let limits = ParserLimits {
        max_type_depth: 4,
        ..ParserLimits::default()
    };
    let err = try_parse_plcopen_project(&xml, &limits).unwrap_err();
    assert!(matches!(err, ParseFailure::TypeTooDeep { limit: 4 }));
    assert!(try_parse_plcopen_project(&xml, &ParserLimits::default()).is_ok());
}

#[test]
fn data_types_struct_enum_and_alias() {
    let xml = r#"<project><types><dataTypes>
  <dataType name="Point">
    <baseType><struct>
      <variable name="X"><type><REAL/></type></variable>
      <variable name="Y"><type><REAL/></type></variable>
    </struct></baseType>
  </dataType>
  <dataType name="Mode">
    <baseType><enum><values><value name="Idle"/><value name="Run"/></values></enum></baseType>
    <initialValue><simpleValue value="Idle"/></initialValue>
  </dataType>
  <dataType name="Buffer">
    <baseType><array><dimension lower="0" upper="255"/><baseType><BYTE/></baseType></array></baseType>
  </dataType>
  <dataType><baseType><INT/></baseType></dataType>
</dataTypes><pous/></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let dts = &project.data_types;
    assert_eq!(dts[0].base_type, "STRUCT");
    assert_eq!(dts[0].members.len(), 2);
    assert_eq!(dts[1].base_type, "ENUM");
    assert_eq!(dts[1].enum_values, ["Idle", "Run"]);
    assert_eq!(dts[1].initial_value.as_deref(), Some("Idle"));
    assert_eq!(dts[2].base_type, "ARRAY[0..255] OF BYTE");
    assert_eq!(dts[3].name, "UnnamedType");
    assert_eq!(dts[3].base_type, "INT");
}

#[test]
fn ld_networks_become_single_rungs() {
    let xml = r#"<project><types><pous><pou name="L" pouType="program"><body><LD>
  <network>
    <comment><content><xhtml xmlns="http://www.w3.org/1999/xhtml">start rung</xhtml></content></comment>
    <leftPowerRail localId="1"/>
    <contact localId="2" negated="true">
      <position x="10" y="20"/>
      <connectionPointIn><connection refLocalId="1"/></connectionPointIn>
      <variable>Start</variable>
    </contact>
    <coil localId="3">
      <connectionPointIn><connection refLocalId="2"/></connectionPointIn>
      <variable>Motor</variable>
    </coil>
  </network>
  <network>
    <contact localId="4"><variable>Stop</variable></contact>
  </network>
</LD></body></pou></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let ld = &project.pous[0].body.ld;
    assert_eq!(ld.len(), 2);
    assert_eq!(ld[0].comment.as_deref(), Some("start rung"));
    assert_eq!(ld[0].rungs.len(), 1);
    let elements = &ld[0].rungs[0].elements;
    let kinds: Vec<_> = elements.iter().map(|e| e.element_type.as_str()).collect();
    assert_eq!(kinds, ["leftPowerRail", "contact", "coil"]);
    assert!(elements[1].negated);
    assert_eq!(elements[1].variable.as_deref(), Some("Start"));
    assert_eq!(elements[1].ref_local_ids, [1]);
    assert_eq!(elements[1].position.map(|p| (p.x, p.y)), Some((10.0, 20.0)));
    assert_eq!(elements[2].local_id, Some(3));
    assert!(ld[1].comment.is_none());
}

#[test]
fn ld_container_without_networks_is_one_network() {
    let xml = r#"<project><types><pous><pou name="L"><body><LD>
  <contact localId="1"><variable>A</variable></contact>
  <coil localId="2"><variable>B</variable></coil>
</LD></body></pou></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let ld = &project.pous[0].body.ld;
    assert_eq!(ld.len(), 1);
    assert_eq!(ld[0].rungs[0].elements.len(), 2);
    assert_eq!(project.pous[0].pou_type, PouType::Unknown);
}

#[test]
fn fbd_blocks_variables_and_connections() {
    let xml = r#"<project><types><pous><pou name="F" pouType="program"><body><FBD>
  <inVariable localId="1"><expression>A</expression></inVariable>
  <inVariable localId="2"><expression>B</expression></inVariable>
  <block localId="3" typeName="AND" instanceName="and1">
    <position x="100" y="50"/>
    <inputVariables>
      <variable formalParameter="IN1"><connectionPointIn><connection refLocalId="1"/></connectionPointIn></variable>
      <variable formalParameter="IN2"><connectionPointIn><connection refLocalId="2"/></connectionPointIn></variable>
    </inputVariables>
    <inOutVariables/>
    <outputVariables>
      <variable formalParameter="OUT"><connectionPointOut/></variable>
    </outputVariables>
  </block>
  <outVariable localId="4" negated="true">
    <connectionPointIn><connection refLocalId="3" formalParameter="OUT"/></connectionPointIn>
    <expression>Q</expression>
  </outVariable>
</FBD></body></pou></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let fbd = &project.pous[0].body.fbd;
    assert_eq!(fbd.len(), 1);
    let net = &fbd[0];

    assert_eq!(net.blocks.len(), 1);
    let block = &net.blocks[0];
    assert_eq!(block.type_name, "AND");
    assert_eq!(block.instance_name.as_deref(), Some("and1"));
    assert_eq!(block.local_id, Some(3));
    assert_eq!(block.inputs, ["IN1", "IN2"]);
    assert_eq!(block.outputs, ["OUT"]);
    assert!(block.in_outs.is_empty());

    let roles: Vec<_> = net.variables.iter().map(|v| v.role).collect();
    assert_eq!(
        roles,
        [FbdVariableRole::In, FbdVariableRole::In, FbdVariableRole::Out]
    );
    assert!(net.variables[2].negated);
    assert_eq!(net.variables[2].expression, "Q");

    assert_eq!(net.connections.len(), 3);
    assert_eq!(net.connections[0].ref_local_id, 1);
    assert_eq!(net.connections[0].formal_parameter, "IN1");
    assert_eq!(net.connections[0].target_local_id, Some(3));
    let out = &net.connections[2];
    assert_eq!(out.ref_local_id, 3);
    assert_eq!(out.formal_parameter, "Q");
    assert_eq!(out.target_local_id, Some(4));
    assert_eq!(out.source_parameter.as_deref(), Some("OUT"));
}

#[test]
fn sfc_steps_transitions_and_actions() {
    let xml = r#"<project><types><pous><pou name="Seq" pouType="program">
  <actions>
    <action name="Fill"><body><ST><xhtml xmlns="http://www.w3.org/1999/xhtml">Valve := TRUE;</xhtml></ST></body></action>
  </actions>
  <body><SFC>
    <step localId="1" name="Init" initialStep="true"/>
    <transition localId="2">
      <connectionPointIn><connection refLocalId="1"/></connectionPointIn>
      <condition><inline name="c"><ST><xhtml xmlns="http://www.w3.org/1999/xhtml">Start</xhtml></ST></inline></condition>
    </transition>
    <step localId="3" name="Filling">
      <connectionPointIn><connection refLocalId="2"/></connectionPointIn>
    </step>
    <actionBlock localId="4">
      <connectionPointIn><connection refLocalId="3"/></connectionPointIn>
      <action localId="5" qualifier="N"><reference name="Fill"/></action>
    </actionBlock>
    <transition localId="6">
      <connectionPointIn><connection refLocalId="3"/></connectionPointIn>
      <condition><inline name="d"><ST><xhtml xmlns="http://www.w3.org/1999/xhtml">Full</xhtml></ST></inline></condition>
    </transition>
    <jumpStep localId="7" targetName="Init">
      <connectionPointIn><connection refLocalId="6"/></connectionPointIn>
    </jumpStep>
  </SFC></body>
</pou></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let sfc = project.pous[0].body.sfc.as_ref().expect("sfc");

    assert_eq!(sfc.steps.len(), 2);
    assert!(sfc.steps[0].initial);
    assert!(!sfc.steps[1].initial);
    assert_eq!(sfc.steps[1].actions, ["Fill"]);
    assert_eq!(sfc.steps[1].local_id, Some(3));

    assert_eq!(sfc.transitions.len(), 2);
    assert_eq!(sfc.transitions[0].from, ["Init"]);
    assert_eq!(sfc.transitions[0].to, ["Filling"]);
    assert_eq!(sfc.transitions[0].condition.as_deref(), Some("Start"));
    assert_eq!(sfc.transitions[1].from, ["Filling"]);
    assert_eq!(sfc.transitions[1].to, ["Init"]);

    assert_eq!(sfc.actions.len(), 1);
    assert_eq!(sfc.actions[0].name, "Fill");
    assert_eq!(sfc.actions[0].body.as_deref(), Some("Valve := TRUE;"));
}

#[test]
fn sfc_divergence_is_resolved_through_junctions() {
    let xml = r#"<project><types><pous><pou name="Seq"><body><SFC>
  <step localId="1" name="A" initialStep="true"/>
  <selectionDivergence localId="2">
    <connectionPointIn><connection refLocalId="1"/></connectionPointIn>
  </selectionDivergence>
  <transition localId="3"><connectionPointIn><connection refLocalId="2"/></connectionPointIn></transition>
  <transition localId="4"><connectionPointIn><connection refLocalId="2"/></connectionPointIn></transition>
  <step localId="5" name="B"><connectionPointIn><connection refLocalId="3"/></connectionPointIn></step>
  <step localId="6" name="C"><connectionPointIn><connection refLocalId="4"/></connectionPointIn></step>
</SFC></body></pou></pous></types></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let sfc = project.pous[0].body.sfc.as_ref().expect("sfc");
    assert_eq!(sfc.transitions[0].from, ["A"]);
    assert_eq!(sfc.transitions[0].to, ["B"]);
    assert_eq!(sfc.transitions[1].from, ["A"]);
    assert_eq!(sfc.transitions[1].to, ["C"]);
    assert!(sfc.transitions[0].condition.is_none());
}

#[test]
fn configurations_resources_and_tasks() {
    let xml = r#"<project><types><pous/></types><instances><configurations>
  <configuration name="Cfg">
    <resource name="Res">
      <task name="Fast" interval="T#10ms" priority="1">
        <pouInstance name="main1" typeName="Main"/>
      </task>
      <task/>
      <globalVars><variable name="Shared"><type><INT/></type></variable></globalVars>
      <pouInstance name="bg" typeName="Background"/>
    </resource>
    <globalVars><variable name="Top"><type><BOOL/></type></variable></globalVars>
  </configuration>
  <configuration/>
</configurations></instances></project>"#;
    let project = parse_plcopen_project(xml).expect("project");
    let cfg = &project.configurations[0];
    assert_eq!(cfg.name, "Cfg");
    assert_eq!(cfg.global_vars[0].name, "Top");
    let res = &cfg.resources[0];
    assert_eq!(res.tasks[0].name, "Fast");
    assert_eq!(res.tasks[0].interval.as_deref(), Some("T#10ms"));
    assert_eq!(res.tasks[0].priority.as_deref(), Some("1"));
    assert_eq!(res.tasks[0].pou_instances[0].type_name, "Main");
    assert_eq!(res.tasks[1].name, "UnnamedTask");
    assert!(res.tasks[1].interval.is_none());
    assert_eq!(res.global_vars[0].name, "Shared");
    assert_eq!(res.pou_instances[0].name, "bg");
    assert_eq!(project.configurations[1].name, "UnnamedConfiguration");
}

#[test]
fn model_serializes_to_camel_case_json() {
    let project = parse_plcopen_project(MINIMAL_PROGRAM).expect("project");
    let json = serde_json::to_value(&project).unwrap();
    assert_eq!(json["companyName"], "ACME");
    assert_eq!(json["pous"][0]["pouType"], "program");
    assert_eq!(json["pous"][0]["interface"]["inputs"][0]["type"], "BOOL");
    assert_eq!(json["pous"][0]["body"]["st"]["code"], "Y := X;");
}
