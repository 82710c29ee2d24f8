//! Textual dump of an IR module
//!
//! Blocks are numbered `%b1, %b2, ...` and unnamed values `%1, %2, ...` in
//! order of first mention, so the output is stable for a given module.
//! Control instructions are labelled `if_1`, `loop_1`, `switch_1` and
//! terminators that leave them carry the label as a trailing comment.

use crate::backend::ir::instr::{CaseSelector, ControlInstr, Instruction, Terminator};
use crate::backend::ir::program::{FunctionParam, Module, ValueKind};
use crate::backend::ir::types::{BlockId, FuncId, InstId, Location, ValueId};
use std::collections::{HashMap, HashSet};

/// Render a module as text
pub fn disassemble(module: &Module) -> String {
    let mut d = Disassembler::new(module);
    d.emit_module();
    d.out
}

struct Disassembler<'m> {
    module: &'m Module,
    out: String,
    indent: usize,
    block_names: HashMap<BlockId, String>,
    value_names: HashMap<ValueId, String>,
    used_names: HashSet<String>,
    next_value: usize,
    control_names: HashMap<InstId, String>,
    control_counts: HashMap<&'static str, usize>,
}

impl<'m> Disassembler<'m> {
    fn new(module: &'m Module) -> Self {
        Self {
            module,
            out: String::new(),
            indent: 0,
            block_names: HashMap::new(),
            value_names: HashMap::new(),
            used_names: HashSet::new(),
            next_value: 0,
            control_names: HashMap::new(),
            control_counts: HashMap::new(),
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    // ========================================================================
    // Naming
    // ========================================================================

    fn block_name(&mut self, block: BlockId) -> String {
        let next = self.block_names.len() + 1;
        self.block_names
            .entry(block)
            .or_insert_with(|| format!("%b{next}"))
            .clone()
    }

    fn value(&mut self, value: ValueId) -> String {
        if let ValueKind::Constant(c) = &self.module.value(value).kind {
            return c.to_string();
        }
        if let Some(name) = self.value_names.get(&value) {
            return name.clone();
        }
        let name = match self.module.name_of(value) {
            Some(base) => {
                let mut candidate = base.to_string();
                let mut suffix = 0;
                while self.used_names.contains(&candidate) {
                    suffix += 1;
                    candidate = format!("{base}_{suffix}");
                }
                candidate
            }
            None => loop {
                self.next_value += 1;
                let candidate = self.next_value.to_string();
                if !self.used_names.contains(&candidate) {
                    break candidate;
                }
            },
        };
        self.used_names.insert(name.clone());
        let name = format!("%{name}");
        self.value_names.insert(value, name.clone());
        name
    }

    fn typed(&mut self, value: ValueId) -> String {
        let name = self.value(value);
        format!("{}:{}", name, self.module.value(value).ty)
    }

    fn values(&mut self, values: &[ValueId]) -> String {
        values
            .iter()
            .map(|&v| self.value(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn control_name(&mut self, inst: InstId) -> String {
        if let Some(name) = self.control_names.get(&inst) {
            return name.clone();
        }
        let kind = self
            .module
            .inst(inst)
            .as_control()
            .map(ControlInstr::kind_name)
            .unwrap_or("unknown");
        let count = self.control_counts.entry(kind).or_insert(0);
        *count += 1;
        let name = format!("{kind}_{count}");
        self.control_names.insert(inst, name.clone());
        name
    }

    fn loop_blocks(&self, inst: InstId) -> Option<(BlockId, BlockId)> {
        match self.module.inst(inst) {
            Instruction::Control(ControlInstr::Loop {
                body, continuing, ..
            }) => Some((*body, *continuing)),
            _ => None,
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    fn emit_module(&mut self) {
        let root = self.module.root_block;
        if !self.module.block(root).instructions.is_empty() {
            self.emit_block(root);
            self.out.push('\n');
        }
        let functions = self.module.functions.clone();
        for (i, func) in functions.into_iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.emit_function(func);
        }
    }

    fn emit_function(&mut self, id: FuncId) {
        let module = self.module;
        let func = module.function(id);
        let name = self.value(func.value);

        let mut header = format!("{name} = ");
        if let Some(stage) = func.stage {
            header.push_str(&format!("@{stage} "));
        }
        if let Some([x, y, z]) = func.workgroup_size {
            header.push_str(&format!("@workgroup_size({x}, {y}, {z}) "));
        }

        let params = func
            .params
            .iter()
            .map(|p| self.param(p))
            .collect::<Vec<_>>()
            .join(", ");
        header.push_str(&format!("func({params}):{}", func.return_type));

        let mut attrs = Vec::new();
        let ret = &func.return_attributes;
        if let Some(builtin) = ret.builtin {
            attrs.push(builtin.to_string());
        }
        if let Some(location) = ret.location {
            attrs.extend(location_attrs(location));
        }
        if ret.invariant {
            attrs.push("@invariant".to_string());
        }
        if !attrs.is_empty() {
            header.push_str(&format!(" [{}]", attrs.join(", ")));
        }

        let block = self.block_name(func.block);
        header.push_str(&format!(" -> {block} {{"));
        self.line(&header);

        self.indent += 1;
        self.emit_block(func.block);
        self.indent -= 1;
        self.line("}");
    }

    fn param(&mut self, param: &FunctionParam) -> String {
        let mut text = self.typed(param.value);
        let mut attrs = Vec::new();
        if let Some(builtin) = param.builtin {
            attrs.push(builtin.to_string());
        }
        if let Some(location) = param.location {
            attrs.extend(location_attrs(location));
        }
        if param.invariant {
            attrs.push("@invariant".to_string());
        }
        if let Some(bp) = param.binding_point {
            attrs.push(bp.to_string());
        }
        if !attrs.is_empty() {
            text.push_str(&format!(" [{}]", attrs.join(", ")));
        }
        text
    }

    fn emit_block(&mut self, block: BlockId) {
        let name = self.block_name(block);
        let comment = self
            .module
            .block(block)
            .role
            .comment()
            .map(|c| format!("  # {c}"))
            .unwrap_or_default();
        self.line(&format!("{name} = block {{{comment}"));

        self.indent += 1;
        let instructions = self.module.block(block).instructions.clone();
        for inst in instructions {
            self.emit_instruction(inst);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn emit_instruction(&mut self, id: InstId) {
        let module = self.module;
        match module.inst(id) {
            Instruction::Control(control) => self.emit_control(id, control),
            Instruction::Terminator(term) => {
                let text = self.terminator(term);
                self.line(&text);
            }
            other => {
                let text = self.instruction(other);
                self.line(&text);
            }
        }
    }

    fn emit_control(&mut self, id: InstId, control: &ControlInstr) {
        let label = self.control_name(id);
        let header = match control {
            ControlInstr::If {
                condition,
                true_block,
                false_block,
                results,
            } => {
                let prefix = if results.is_empty() {
                    String::new()
                } else {
                    let results = results
                        .iter()
                        .map(|&r| self.typed(r))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{results} = ")
                };
                let condition = self.value(*condition);
                let t = self.block_name(*true_block);
                let f = self.block_name(*false_block);
                format!("{prefix}if {condition} [t: {t}, f: {f}]")
            }
            ControlInstr::Loop {
                initializer,
                body,
                continuing,
            } => {
                let mut parts = Vec::new();
                if let Some(init) = initializer {
                    parts.push(format!("i: {}", self.block_name(*init)));
                }
                parts.push(format!("b: {}", self.block_name(*body)));
                parts.push(format!("c: {}", self.block_name(*continuing)));
                format!("loop [{}]", parts.join(", "))
            }
            ControlInstr::Switch { condition, cases } => {
                let condition = self.value(*condition);
                let cases = cases
                    .iter()
                    .map(|case| {
                        let selectors = case
                            .selectors
                            .iter()
                            .map(|s| match s {
                                CaseSelector::Default => "default".to_string(),
                                CaseSelector::Value(v) => self.value(*v),
                            })
                            .collect::<Vec<_>>()
                            .join(" ");
                        format!("c: ({selectors}, {})", self.block_name(case.block))
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("switch {condition} [{cases}]")
            }
        };
        self.line(&format!("{header} {{  # {label}"));

        self.indent += 1;
        for block in control.blocks() {
            self.emit_block(block);
        }
        self.indent -= 1;
        self.line("}");
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    fn instruction(&mut self, inst: &Instruction) -> String {
        let prefix = match inst.result() {
            Some(result) => format!("{} = ", self.typed(result)),
            None => String::new(),
        };
        let body = match inst {
            Instruction::Var {
                initializer,
                binding_point,
                ..
            } => {
                let mut text = "var".to_string();
                if let Some(init) = initializer {
                    text.push_str(&format!(" {}", self.value(*init)));
                }
                if let Some(bp) = binding_point {
                    text.push_str(&format!(" {bp}"));
                }
                text
            }
            Instruction::Let { value, .. } => format!("let {}", self.value(*value)),
            Instruction::Load { from, .. } => format!("load {}", self.value(*from)),
            Instruction::Store { to, value } => {
                format!("store {}, {}", self.value(*to), self.value(*value))
            }
            Instruction::LoadVectorElement { from, index, .. } => format!(
                "load_vector_element {}, {}",
                self.value(*from),
                self.value(*index)
            ),
            Instruction::StoreVectorElement { to, index, value } => format!(
                "store_vector_element {}, {}, {}",
                self.value(*to),
                self.value(*index),
                self.value(*value)
            ),
            Instruction::Access {
                object, indices, ..
            } => format!("access {}, {}", self.value(*object), self.values(indices)),
            Instruction::Swizzle {
                object, indices, ..
            } => {
                let lanes: String = indices
                    .iter()
                    .map(|&i| ['x', 'y', 'z', 'w'].get(i as usize).copied().unwrap_or('?'))
                    .collect();
                format!("swizzle {}, {lanes}", self.value(*object))
            }
            Instruction::Binary { op, lhs, rhs, .. } => format!(
                "{} {}, {}",
                op.mnemonic(),
                self.value(*lhs),
                self.value(*rhs)
            ),
            Instruction::Unary { op, operand, .. } => {
                format!("{} {}", op.mnemonic(), self.value(*operand))
            }
            Instruction::Bitcast { value, .. } => format!("bitcast {}", self.value(*value)),
            Instruction::Call { callee, args, .. } => {
                let callee = self.value(self.module.function(*callee).value);
                if args.is_empty() {
                    format!("call {callee}")
                } else {
                    format!("call {callee}, {}", self.values(args))
                }
            }
            Instruction::BuiltinCall { builtin, args, .. } => {
                if args.is_empty() {
                    builtin.clone()
                } else {
                    format!("{builtin} {}", self.values(args))
                }
            }
            Instruction::Construct { args, .. } => {
                if args.is_empty() {
                    "construct".to_string()
                } else {
                    format!("construct {}", self.values(args))
                }
            }
            Instruction::Convert { value, .. } => format!("convert {}", self.value(*value)),
            Instruction::Discard => "discard".to_string(),
            Instruction::Control(c) => c.kind_name().to_string(),
            Instruction::Terminator(t) => t.mnemonic().to_string(),
        };
        format!("{prefix}{body}")
    }

    fn terminator(&mut self, term: &Terminator) -> String {
        match term {
            Terminator::Return { value: None, .. } => "ret".to_string(),
            Terminator::Return {
                value: Some(v), ..
            } => format!("ret {}", self.value(*v)),
            Terminator::ExitIf { target, args } => {
                let label = self.control_name(*target);
                if args.is_empty() {
                    format!("exit_if  # {label}")
                } else {
                    format!("exit_if {}  # {label}", self.values(args))
                }
            }
            Terminator::ExitLoop { target } => {
                format!("exit_loop  # {}", self.control_name(*target))
            }
            Terminator::ExitSwitch { target } => {
                format!("exit_switch  # {}", self.control_name(*target))
            }
            Terminator::Continue { target } => match self.loop_blocks(*target) {
                Some((_, continuing)) => format!("continue {}", self.block_name(continuing)),
                None => "continue".to_string(),
            },
            Terminator::NextIteration { target } => match self.loop_blocks(*target) {
                Some((body, _)) => format!("next_iteration {}", self.block_name(body)),
                None => "next_iteration".to_string(),
            },
            Terminator::BreakIf { target, condition } => {
                let condition = self.value(*condition);
                match self.loop_blocks(*target) {
                    Some((body, _)) => format!("break_if {condition} {}", self.block_name(body)),
                    None => format!("break_if {condition}"),
                }
            }
            Terminator::Unreachable => "unreachable".to_string(),
        }
    }
}

fn location_attrs(location: Location) -> Vec<String> {
    let mut attrs = vec![format!("@location({})", location.value)];
    if let Some(interpolation) = location.interpolation {
        attrs.push(interpolation.to_string());
    }
    attrs
}
