//! # Sandbox 模块
//!
//! 可恢复的行为脚本解释器。
//!
//! ## 执行模型
//!
//! ```text
//! resume(caps) -> TaskStatus
//! ```
//!
//! 1. 若正在等待的完成信号尚未完成，直接返回 `Suspended`
//! 2. 否则从程序计数器继续执行，直到遇到未完成的 `await`、脚本结束或出错
//!
//! 两次 `await` 之间的语句在同一次 `resume` 中同步执行完毕。
//! 出错时已执行语句的效果保留，剩余语句放弃。

use tracing::debug;

use super::capability::{Capabilities, ScriptScope};
use crate::completion::Completion;
use crate::error::RuntimeError;
use crate::script::expr::{EvalContext, evaluate, evaluate_to_bool, expect_str};
use crate::script::{BehaviorScript, Call, CommandName, Instr};
use crate::state::{VarValue, Variables};

/// 任务状态
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    /// 等待某个完成信号
    Suspended,
    /// 执行完毕
    Finished,
    /// 第 `line` 行出错，任务终止
    Failed { line: usize, error: RuntimeError },
}

/// 一次行为脚本调用
#[derive(Debug)]
pub struct BehaviorTask {
    script: BehaviorScript,
    scope: ScriptScope,
    pc: usize,
    waiting: Option<Completion>,
    done: bool,
}

impl BehaviorTask {
    pub fn new(script: BehaviorScript, scope: ScriptScope) -> Self {
        Self {
            script,
            scope,
            pc: 0,
            waiting: None,
            done: false,
        }
    }

    pub fn scope(&self) -> &ScriptScope {
        &self.scope
    }

    /// 是否挂起在未完成的信号上
    pub fn is_waiting(&self) -> bool {
        self.waiting.as_ref().is_some_and(|w| !w.is_resolved())
    }

    /// 继续执行
    pub fn resume(&mut self, caps: &mut impl Capabilities) -> TaskStatus {
        if self.done {
            return TaskStatus::Finished;
        }
        if self.is_waiting() {
            return TaskStatus::Suspended;
        }
        self.waiting = None;

        let status = self.run(caps);
        if !matches!(status, TaskStatus::Suspended) {
            self.done = true;
        }
        status
    }

    fn run(&mut self, caps: &mut impl Capabilities) -> TaskStatus {
        loop {
            let Some(instr) = self.script.instructions().get(self.pc) else {
                return TaskStatus::Finished;
            };

            match instr {
                Instr::Jump { target } => self.pc = *target,

                Instr::JumpUnless {
                    condition,
                    target,
                    line,
                } => {
                    let ctx = ScopeContext {
                        variables: caps.variables(),
                        scope: &self.scope,
                    };
                    match evaluate_to_bool(condition, &ctx) {
                        Ok(true) => self.pc += 1,
                        Ok(false) => self.pc = *target,
                        Err(error) => return TaskStatus::Failed { line: *line, error },
                    }
                }

                Instr::Call { call, awaited } => {
                    self.pc += 1;
                    match execute_call(call, &self.scope, caps) {
                        Err(error) => {
                            return TaskStatus::Failed {
                                line: call.line,
                                error,
                            };
                        }
                        Ok(Some(completion)) if *awaited && !completion.is_resolved() => {
                            debug!(command = %call.command, line = call.line, "脚本挂起");
                            self.waiting = Some(completion);
                            return TaskStatus::Suspended;
                        }
                        Ok(_) => {}
                    }
                }
            }
        }
    }
}

/// 表达式求值上下文：共享变量 + 当前作用域
struct ScopeContext<'a> {
    variables: &'a Variables,
    scope: &'a ScriptScope,
}

impl EvalContext for ScopeContext<'_> {
    fn get_var(&self, name: &str) -> Option<&VarValue> {
        self.variables.get(name)
    }

    fn object_id(&self) -> &str {
        &self.scope.object_id
    }

    fn scene_id(&self) -> &str {
        &self.scope.scene_id
    }
}

/// 执行一次能力调用，可等待的能力返回其完成信号
fn execute_call(
    call: &Call,
    scope: &ScriptScope,
    caps: &mut impl Capabilities,
) -> Result<Option<Completion>, RuntimeError> {
    let args = {
        let ctx = ScopeContext {
            variables: caps.variables(),
            scope,
        };
        call.args
            .iter()
            .map(|arg| evaluate(arg, &ctx))
            .collect::<Result<Vec<_>, _>>()?
    };
    let args = Args {
        command: call.command,
        values: &args,
    };

    match call.command {
        CommandName::Set => {
            let name = args.string(0)?;
            caps.set_variable(name, args.value(1)?.clone());
        }
        // 语句位置的 GET 只求值，没有效果
        CommandName::Get => {}
        CommandName::Log => caps.log(args.value(0)?.to_string()),
        CommandName::Reskin => {
            let drawing = args.string(0)?;
            let object = args.string_or(1, &scope.object_id)?;
            caps.reskin(&scope.scene_id, object, drawing)?;
        }
        CommandName::Show | CommandName::Hide => {
            let object = args.string_or(0, &scope.object_id)?;
            let hidden = call.command == CommandName::Hide;
            caps.set_hidden(&scope.scene_id, object, hidden)?;
        }
        CommandName::Transfer => caps.transfer(args.string(0)?)?,
        CommandName::Say => return Ok(Some(caps.say(&args.value(0)?.to_string()))),
        CommandName::Delay => {
            let seconds = args.seconds(0)?;
            return Ok(Some(caps.delay(seconds)));
        }
        CommandName::Dialogue => return Ok(Some(caps.dialogue_idle())),
        CommandName::ResetObject => {
            let object = args.string_or(0, &scope.object_id)?;
            caps.reset_object(&scope.scene_id, object)?;
        }
        CommandName::ResetScene => {
            let scene = args.string_or(0, &scope.scene_id)?;
            caps.reset_scene(scene)?;
        }
        CommandName::ResetGame => caps.reset_game(),
    }

    Ok(None)
}

/// 已求值的参数
struct Args<'a> {
    command: CommandName,
    values: &'a [VarValue],
}

impl<'a> Args<'a> {
    fn value(&self, index: usize) -> Result<&'a VarValue, RuntimeError> {
        self.values
            .get(index)
            .ok_or_else(|| RuntimeError::InvalidArgument {
                command: self.command.to_string(),
                message: format!("缺少第 {} 个参数", index + 1),
            })
    }

    fn string(&self, index: usize) -> Result<&'a str, RuntimeError> {
        let context = format!("{} 第 {} 个参数", self.command, index + 1);
        expect_str(self.value(index)?, &context)
    }

    /// 可选的字符串参数，省略时使用 `default`
    fn string_or<'b>(&self, index: usize, default: &'b str) -> Result<&'b str, RuntimeError>
    where
        'a: 'b,
    {
        if index < self.values.len() {
            self.string(index)
        } else {
            Ok(default)
        }
    }

    fn seconds(&self, index: usize) -> Result<f64, RuntimeError> {
        let value = self.value(index)?;
        match value.as_f64() {
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
            Some(seconds) => Err(RuntimeError::InvalidArgument {
                command: self.command.to_string(),
                message: format!("秒数必须是非负有限数，实际 {seconds}"),
            }),
            None => Err(RuntimeError::TypeMismatch {
                expected: "number",
                actual: value.type_name().to_string(),
                context: format!("{} 第 {} 个参数", self.command, index + 1),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 记录调用的能力表
    #[derive(Default)]
    struct Recorder {
        variables: Variables,
        calls: Vec<String>,
        pending: Vec<Completion>,
        objects: Vec<String>,
    }

    impl Recorder {
        fn with_objects(objects: &[&str]) -> Self {
            Self {
                objects: objects.iter().map(|o| o.to_string()).collect(),
                ..Self::default()
            }
        }

        fn check(&self, scene: &str, object: &str) -> Result<(), RuntimeError> {
            if self.objects.iter().any(|o| o == object) {
                Ok(())
            } else {
                Err(RuntimeError::UnknownObject {
                    scene: scene.to_string(),
                    object: object.to_string(),
                })
            }
        }

        fn pending(&mut self) -> Completion {
            let completion = Completion::new();
            self.pending.push(completion.clone());
            completion
        }
    }

    impl Capabilities for Recorder {
        fn variables(&self) -> &Variables {
            &self.variables
        }

        fn set_variable(&mut self, name: &str, value: VarValue) {
            self.variables.set(name, value);
        }

        fn log(&mut self, text: String) {
            self.calls.push(format!("log {text}"));
        }

        fn reskin(&mut self, scene: &str, object: &str, drawing: &str) -> Result<(), RuntimeError> {
            self.check(scene, object)?;
            self.calls.push(format!("reskin {scene}/{object} {drawing}"));
            Ok(())
        }

        fn set_hidden(
            &mut self,
            scene: &str,
            object: &str,
            hidden: bool,
        ) -> Result<(), RuntimeError> {
            self.check(scene, object)?;
            self.calls.push(format!("hidden {scene}/{object} {hidden}"));
            Ok(())
        }

        fn transfer(&mut self, scene: &str) -> Result<(), RuntimeError> {
            self.calls.push(format!("transfer {scene}"));
            Ok(())
        }

        fn say(&mut self, text: &str) -> Completion {
            self.calls.push(format!("say {text}"));
            self.pending()
        }

        fn delay(&mut self, seconds: f64) -> Completion {
            self.calls.push(format!("delay {seconds}"));
            self.pending()
        }

        fn dialogue_idle(&mut self) -> Completion {
            self.calls.push("dialogue".to_string());
            Completion::resolved()
        }

        fn reset_object(&mut self, scene: &str, object: &str) -> Result<(), RuntimeError> {
            self.calls.push(format!("reset_object {scene}/{object}"));
            Ok(())
        }

        fn reset_scene(&mut self, scene: &str) -> Result<(), RuntimeError> {
            self.calls.push(format!("reset_scene {scene}"));
            Ok(())
        }

        fn reset_game(&mut self) {
            self.calls.push("reset_game".to_string());
        }
    }

    fn task(source: &str) -> BehaviorTask {
        let script = BehaviorScript::compile(source).unwrap();
        BehaviorTask::new(script, ScriptScope::new("door", "hall"))
    }

    #[test]
    fn test_runs_to_completion_without_await() {
        let mut caps = Recorder::with_objects(&["door", "lamp"]);
        let mut task = task(
            "SET('n', 2)\nRESKIN('open')\nHIDE('lamp')\nSAY('hi')\nLOG('n=' + GET('n'))",
        );

        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
        assert_eq!(
            caps.calls,
            vec![
                "reskin hall/door open",
                "hidden hall/lamp true",
                "say hi",
                "log n=2"
            ]
        );
        // 未 await 的 SAY 不会挂起
        assert_eq!(caps.pending.len(), 1);
        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
    }

    #[test]
    fn test_await_suspends_until_resolved() {
        let mut caps = Recorder::with_objects(&["door"]);
        let mut task = task("await SAY('one')\nawait DELAY(0.5)\nSHOW()");

        assert_eq!(task.resume(&mut caps), TaskStatus::Suspended);
        assert_eq!(caps.calls, vec!["say one"]);

        // 信号未完成时 resume 不推进
        assert_eq!(task.resume(&mut caps), TaskStatus::Suspended);
        assert_eq!(caps.calls.len(), 1);

        caps.pending[0].resolve();
        assert_eq!(task.resume(&mut caps), TaskStatus::Suspended);
        assert_eq!(caps.calls, vec!["say one", "delay 0.5"]);

        caps.pending[1].resolve();
        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
        assert_eq!(caps.calls.last().unwrap(), "hidden hall/door false");
    }

    #[test]
    fn test_await_on_resolved_signal_continues_same_turn() {
        let mut caps = Recorder::with_objects(&["door"]);
        let mut task = task("await DIALOGUE()\nLOG('after')");

        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
        assert_eq!(caps.calls, vec!["dialogue", "log after"]);
    }

    #[test]
    fn test_failure_keeps_earlier_effects() {
        let mut caps = Recorder::with_objects(&["door"]);
        let mut task = task("SET('a', 1)\nLOG('before')\nHIDE('ghost')\nLOG('after')");

        let status = task.resume(&mut caps);
        assert_eq!(
            status,
            TaskStatus::Failed {
                line: 3,
                error: RuntimeError::UnknownObject {
                    scene: "hall".to_string(),
                    object: "ghost".to_string(),
                },
            }
        );
        assert_eq!(caps.calls, vec!["log before"]);
        assert_eq!(caps.variables.get("a"), Some(&VarValue::Int(1)));

        // 失败后的任务不再执行
        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
        assert_eq!(caps.calls.len(), 1);
    }

    #[test]
    fn test_branches_use_shared_variables() {
        let mut caps = Recorder::with_objects(&["door"]);
        caps.set_variable("visits", VarValue::Int(3));

        let mut task = task(
            "if GET('visits') > 2 and OBJECT == 'door' {\n LOG('often')\n} else {\n LOG('rarely')\n}",
        );
        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
        assert_eq!(caps.calls, vec!["log often"]);
    }

    #[test]
    fn test_argument_errors() {
        let mut caps = Recorder::with_objects(&["door"]);

        let status = task("DELAY(-1)").resume(&mut caps);
        assert!(matches!(
            status,
            TaskStatus::Failed {
                error: RuntimeError::InvalidArgument { .. },
                ..
            }
        ));

        let status = task("TRANSFER(3)").resume(&mut caps);
        assert!(matches!(
            status,
            TaskStatus::Failed {
                line: 1,
                error: RuntimeError::TypeMismatch { expected: "string", .. },
            }
        ));

        let status = task("\nif 1 { SHOW() }").resume(&mut caps);
        assert!(matches!(status, TaskStatus::Failed { line: 2, .. }));
    }

    #[test]
    fn test_default_scope_arguments() {
        let mut caps = Recorder::with_objects(&["door"]);
        let mut task = task("RESET_OBJECT()\nRESET_SCENE()\nRESET_SCENE('cellar')\nRESET_GAME()");

        assert_eq!(task.resume(&mut caps), TaskStatus::Finished);
        assert_eq!(
            caps.calls,
            vec![
                "reset_object hall/door",
                "reset_scene hall",
                "reset_scene cellar",
                "reset_game"
            ]
        );
    }
}
