use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::compiler::artifact::{Artifact, FunctionRecord};
use crate::compiler::ir::{Operation, Quadruple, Target};
use crate::error::{Error, Result};
use crate::memory::{Address, Memory, MemoryLayout, Region, Value, ValueKind};

/// Saved caller state
#[derive(Debug)]
struct Frame {
    memory: Memory,
    return_ip: usize,
}

/// Quadruple virtual machine
///
/// Executes an [`Artifact`] against two memories: the global memory and the
/// activation memory of the running function. `ERA` builds a pending
/// activation sized from the function table, `PARAM` fills it and `GOSUB`
/// installs it, saving the caller on the call stack. `ENDSUB` restores the
/// caller; when the call stack becomes empty the program ends.
pub struct VirtualMachine<R: BufRead, W: Write> {
    layout: MemoryLayout,
    quadruples: Rc<Vec<Quadruple>>,
    functions: HashMap<String, FunctionRecord>,
    global: Memory,
    local: Memory,
    pending: Vec<Memory>,
    call_stack: Vec<Frame>,
    last_return: Option<Value>,
    input: R,
    output: W,
}

impl VirtualMachine<io::StdinLock<'static>, io::Stdout> {
    /// Creates a VM wired to standard input and output
    pub fn new(artifact: Artifact) -> Result<Self> {
        Self::with_io(artifact, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> VirtualMachine<R, W> {
    /// Creates a VM reading `read` input from `input` and printing to `output`
    pub fn with_io(artifact: Artifact, input: R, output: W) -> Result<Self> {
        Self::with_layout(artifact, MemoryLayout::default(), input, output)
    }

    /// Like [`with_io`](Self::with_io) for an artifact compiled with a non-default layout
    pub fn with_layout(artifact: Artifact, layout: MemoryLayout, input: R, output: W) -> Result<Self> {
        let mut global = Memory::with_resources(Region::Global, layout, &artifact.global_resources)?;
        for (address, value) in artifact.global_memory {
            if let Some(value) = value {
                global.set(address, value)?;
            }
        }
        let functions = artifact
            .functions
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();

        Ok(Self {
            layout,
            quadruples: Rc::new(artifact.quadruples),
            functions,
            global,
            local: Memory::new(Region::Local, layout),
            pending: Vec::new(),
            call_stack: Vec::new(),
            last_return: None,
            input,
            output,
        })
    }

    /// Global memory, for inspection after a run
    pub fn global_memory(&self) -> &Memory {
        &self.global
    }

    /// Consumes the VM, returning its output sink
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs the program from instruction 0.
    /// Returns the value of `main`'s executed `RETURN`, or `None` when `main`
    /// ends without one. A callee's value is dropped once control leaves it.
    pub fn run(&mut self) -> Result<Option<Value>> {
        if self.quadruples.is_empty() {
            return Err(Error::EmptyProgram);
        }
        let quadruples = Rc::clone(&self.quadruples);
        let mut ip = 0;
        let mut steps: u64 = 0;

        while let Some(quad) = quadruples.get(ip) {
            tracing::trace!(ip, quad = %quad, "execute");
            steps += 1;
            match self.step(ip, quad)? {
                Some(next) => ip = next,
                None => break,
            }
        }

        self.output.flush()?;
        tracing::debug!(steps, "program finished");
        Ok(self.last_return.clone())
    }

    /// Executes one quadruple, returning the next instruction pointer or `None` to halt
    fn step(&mut self, ip: usize, quad: &Quadruple) -> Result<Option<usize>> {
        let mut next = ip + 1;

        match (quad.op, quad.left, quad.right, &quad.result) {
            (op, Some(left), Some(right), Target::Address(dst)) if op.is_binary() => {
                let l = self.read(left)?;
                let r = self.read(right)?;
                let value = evaluate(op, l, r)?;
                self.write(*dst, value)?;
            }

            (Operation::Assign, Some(src), None, Target::Address(dst)) => {
                let value = self.read(src)?;
                self.write(*dst, value)?;
            }

            (Operation::Goto, None, None, Target::Jump(target)) => next = *target,

            (Operation::GotoF, Some(cond), None, Target::Jump(target)) => {
                match self.read(cond)? {
                    Value::Bool(false) => next = *target,
                    Value::Bool(true) => {}
                    other => {
                        return Err(Error::runtime(format!(
                            "GOTOF condition must be bool, found {:?}",
                            other
                        )))
                    }
                }
            }

            (Operation::Era, None, None, Target::Function(name)) => {
                let record = self.function(name)?;
                let memory = Memory::with_resources(Region::Local, self.layout, &record.resources)?;
                self.pending.push(memory);
            }

            (Operation::Param, Some(src), None, Target::Address(dst)) => {
                let value = self.read(src)?;
                self.pending_memory()?.set(*dst, value)?;
            }

            (Operation::OptParam, Some(src), None, Target::Address(dst)) => {
                let value = self.read_optional(src)?;
                let pending = self.pending_memory()?;
                match value {
                    Some(value) => pending.set(*dst, value)?,
                    None => pending.clear(*dst)?,
                }
            }

            (Operation::OptAssign, Some(src), None, Target::Address(dst)) => {
                match self.read_optional(src)? {
                    Some(value) => self.write(*dst, value)?,
                    None => {
                        let dst = self.resolve(*dst)?;
                        self.memory_mut(dst).clear(dst)?;
                    }
                }
            }

            (Operation::Gosub, None, None, Target::Function(name)) => {
                let entry = self.function(name)?.entry;
                let activation = self.pending.pop().ok_or_else(|| {
                    Error::runtime(format!("GOSUB {} without a matching ERA", name))
                })?;
                let caller = std::mem::replace(&mut self.local, activation);
                self.call_stack.push(Frame {
                    memory: caller,
                    return_ip: next,
                });
                next = entry;
            }

            (Operation::EndSub, None, None, Target::None) => match self.call_stack.pop() {
                Some(frame) => {
                    self.local = frame.memory;
                    if self.call_stack.is_empty() {
                        return Ok(None);
                    }
                    // A callee's value lives on in its return slot only
                    self.last_return = None;
                    next = frame.return_ip;
                }
                None => return Ok(None),
            },

            (Operation::Return, Some(src), None, Target::Address(slot)) => {
                let value = self.read(src)?;
                self.write(*slot, value.clone())?;
                self.last_return = Some(value);
            }

            (Operation::Print, None, None, Target::Address(src)) => {
                let value = self.read(*src)?;
                write!(self.output, "{}", value)?;
            }

            (Operation::Read, None, None, Target::Address(dst)) => {
                self.output.flush()?;
                let mut line = String::new();
                self.input.read_line(&mut line)?;
                let trimmed = line.strip_suffix('\n').unwrap_or(&line);
                let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
                self.write(*dst, Value::Str(trimmed.to_string()))?;
            }

            (Operation::Ver, Some(index), Some(lower), Target::Address(upper)) => {
                let index = self.read_int(index)?;
                let lower = self.read_int(lower)?;
                let upper = self.read_int(*upper)?;
                if index < lower || index >= upper {
                    return Err(Error::IndexOutOfBounds {
                        index,
                        lower,
                        upper,
                    });
                }
            }

            (Operation::SavePtr, Some(src), None, Target::Address(pointer)) => {
                let target = self.read_int(src)?;
                let target = Address::try_from(target).map_err(|_| Error::InvalidAddress {
                    address: *pointer,
                })?;
                // The pointer cell itself is the destination, not what it points to
                self.memory_mut(*pointer).set(*pointer, Value::Pointer(target))?;
            }

            _ => {
                return Err(Error::UnknownInstruction {
                    index: ip,
                    instruction: quad.to_string(),
                })
            }
        }

        Ok(Some(next))
    }

    fn function(&self, name: &str) -> Result<&FunctionRecord> {
        self.functions
            .get(name)
            .ok_or_else(|| Error::UndefinedFunction {
                name: name.to_string(),
            })
    }

    fn pending_memory(&mut self) -> Result<&mut Memory> {
        self.pending
            .last_mut()
            .ok_or_else(|| Error::runtime("PARAM without a pending activation"))
    }

    fn memory(&self, address: Address) -> &Memory {
        match self.layout.region_of(address) {
            Region::Global => &self.global,
            Region::Local => &self.local,
        }
    }

    fn memory_mut(&mut self, address: Address) -> &mut Memory {
        match self.layout.region_of(address) {
            Region::Global => &mut self.global,
            Region::Local => &mut self.local,
        }
    }

    /// Follows one level of pointer indirection
    fn resolve(&self, address: Address) -> Result<Address> {
        if self.layout.kind_of(address) != Some(ValueKind::Pointer) {
            return Ok(address);
        }
        match self.memory(address).get(address)? {
            Some(Value::Pointer(target)) => Ok(target),
            Some(other) => Err(Error::runtime(format!(
                "pointer cell {} holds {:?}",
                address, other
            ))),
            None => Err(Error::UninitializedVariable { address }),
        }
    }

    fn read_optional(&self, address: Address) -> Result<Option<Value>> {
        let address = self.resolve(address)?;
        self.memory(address).get(address)
    }

    fn read(&self, address: Address) -> Result<Value> {
        let resolved = self.resolve(address)?;
        self.memory(resolved)
            .get(resolved)?
            .ok_or(Error::UninitializedVariable { address: resolved })
    }

    fn read_int(&self, address: Address) -> Result<i64> {
        match self.read(address)? {
            Value::Int(i) => Ok(i),
            other => Err(Error::runtime(format!(
                "expected an int at {}, found {:?}",
                address, other
            ))),
        }
    }

    fn write(&mut self, address: Address, value: Value) -> Result<()> {
        let address = self.resolve(address)?;
        self.memory_mut(address).set(address, value)
    }
}

/// Applies a binary operation to two values
fn evaluate(op: Operation, left: Value, right: Value) -> Result<Value> {
    use Value::{Bool, Float, Int, Str};

    let value = match (left, right) {
        (Int(a), Int(b)) => match op {
            Operation::Plus => Int(a.wrapping_add(b)),
            Operation::Minus => Int(a.wrapping_sub(b)),
            Operation::Times => Int(a.wrapping_mul(b)),
            Operation::Divides => {
                if b == 0 {
                    return Err(Error::DivisionByZero);
                }
                Int(a.wrapping_div(b))
            }
            _ => return compare(op, a.cmp(&b)),
        },
        (Int(a), Float(b)) => return evaluate_float(op, a as f64, b),
        (Float(a), Int(b)) => return evaluate_float(op, a, b as f64),
        (Float(a), Float(b)) => return evaluate_float(op, a, b),
        (Str(a), Str(b)) => match op {
            Operation::Plus => Str(a + &b),
            _ => return compare(op, a.cmp(&b)),
        },
        (Bool(a), Bool(b)) => match op {
            Operation::And => Bool(a && b),
            Operation::Or => Bool(a || b),
            _ => return compare(op, a.cmp(&b)),
        },
        (left, right) => {
            return Err(Error::runtime(format!(
                "'{}' cannot be applied to {:?} and {:?}",
                op, left, right
            )))
        }
    };
    Ok(value)
}

fn evaluate_float(op: Operation, a: f64, b: f64) -> Result<Value> {
    let value = match op {
        Operation::Plus => Value::Float(a + b),
        Operation::Minus => Value::Float(a - b),
        Operation::Times => Value::Float(a * b),
        Operation::Divides => Value::Float(a / b),
        Operation::Eq => Value::Bool(a == b),
        Operation::Diff => Value::Bool(a != b),
        Operation::Lt => Value::Bool(a < b),
        Operation::Gt => Value::Bool(a > b),
        Operation::LtEq => Value::Bool(a <= b),
        Operation::GtEq => Value::Bool(a >= b),
        _ => {
            return Err(Error::runtime(format!(
                "'{}' cannot be applied to numbers",
                op
            )))
        }
    };
    Ok(value)
}

fn compare(op: Operation, ordering: std::cmp::Ordering) -> Result<Value> {
    use std::cmp::Ordering::{Equal, Greater, Less};

    let result = match op {
        Operation::Eq => ordering == Equal,
        Operation::Diff => ordering != Equal,
        Operation::Lt => ordering == Less,
        Operation::Gt => ordering == Greater,
        Operation::LtEq => ordering != Greater,
        Operation::GtEq => ordering != Less,
        _ => {
            return Err(Error::runtime(format!(
                "'{}' is not a comparison",
                op
            )))
        }
    };
    Ok(Value::Bool(result))
}
