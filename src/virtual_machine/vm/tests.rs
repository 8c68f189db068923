use super::*;
use crate::virtual_machine::decoder::decode_line;
use crate::virtual_machine::errors::ErrorKind;

fn run_vm(source: &str) -> Machine {
    let mut vm = Machine::default();
    for (idx, line) in source.lines().enumerate() {
        if let Some(raw) = decode_line(line) {
            vm.step(idx + 1, &raw);
        }
    }
    vm
}

fn run_and_get(source: &str, reg: Register) -> i64 {
    run_vm(source).registers().get(reg)
}

fn trace(source: &str) -> Vec<String> {
    run_vm(source).log().lines()
}

fn faults(source: &str) -> Vec<(usize, VMError)> {
    run_vm(source)
        .log()
        .faults()
        .map(|(line, err)| (line, err.clone()))
        .collect()
}

// ==================== MOV ====================

#[test]
fn mov_immediates() {
    assert_eq!(run_and_get("MOV eax, 42", Register::Eax), 42);
    assert_eq!(run_and_get("MOV eax, -1", Register::Eax), -1);
    assert_eq!(run_and_get("mov eax, 0xff", Register::Eax), 255);
}

#[test]
fn mov_register_to_register() {
    let vm = run_vm("MOV esi, 5\nMOV edi, esi\nMOV esi, 6");
    assert_eq!(vm.registers().get(Register::Edi), 5);
    assert_eq!(vm.registers().get(Register::Esi), 6);
}

#[test]
fn mov_to_absolute_memory() {
    let vm = run_vm("MOV [10], 0x10");
    assert_eq!(vm.memory().load(10), Ok(16));
    assert_eq!(vm.log().lines(), ["MOV: Set memory[10] = 16"]);
}

#[test]
fn mov_memory_to_memory() {
    let vm = run_vm("MOV [1], 8\nMOV [2], [1]");
    assert_eq!(vm.memory().load(2), Ok(8));
}

#[test]
fn mov_through_register_address() {
    let vm = run_vm("MOV ebp, 20\nMOV [ebp], 3\nMOV eax, [ebp]");
    assert_eq!(vm.registers().get(Register::Eax), 3);
    assert_eq!(vm.memory().load(20), Ok(3));
}

#[test]
fn mov_unparsable_source_writes_zero_and_logs() {
    let vm = run_vm("MOV eax, 5\nMOV eax, five");
    assert_eq!(vm.registers().get(Register::Eax), 0);
    assert_eq!(
        vm.log().lines(),
        [
            "MOV: Set eax = 5",
            "Error: Can't parse value five (line 2)",
            "MOV: Set eax = 0",
        ]
    );
}

#[test]
fn mov_invalid_memory_reference_in_source() {
    assert_eq!(
        faults("MOV eax, [nowhere]"),
        [(
            1,
            VMError::InvalidMemoryReference {
                token: "[nowhere]".into()
            }
        )]
    );
}

#[test]
fn mov_invalid_memory_reference_in_destination_has_no_effect() {
    let vm = run_vm("MOV [x], 5");
    assert!(vm.memory().cells().iter().all(|&c| c == 0));
    assert_eq!(vm.log().lines(), ["Error: Invalid memory reference [x] (line 1)"]);
}

#[test]
fn mov_immediate_destination_is_target_error() {
    let vm = run_vm("MOV 5, eax");
    assert_eq!(vm.log().count_kind(ErrorKind::Target), 1);
    assert_eq!(vm.log().lines(), ["Error: Invalid destination 5 (line 1)"]);
}

// ==================== ADD / SUB ====================

#[test]
fn add_and_sub_with_register_source() {
    let src = "MOV eax, 10\nMOV ebx, 4\nADD eax, ebx\nSUB ebx, eax";
    let vm = run_vm(src);
    assert_eq!(vm.registers().get(Register::Eax), 14);
    assert_eq!(vm.registers().get(Register::Ebx), -10);
}

#[test]
fn add_from_memory() {
    assert_eq!(
        run_and_get("MOV [3], 7\nMOV ecx, 1\nADD ecx, [3]", Register::Ecx),
        8
    );
}

#[test]
fn add_wraps_at_word_boundary() {
    let src = format!("MOV eax, {}\nADD eax, 1", i64::MAX);
    assert_eq!(run_and_get(&src, Register::Eax), i64::MIN);

    let src = format!("MOV eax, {}\nSUB eax, 1", i64::MIN);
    assert_eq!(run_and_get(&src, Register::Eax), i64::MAX);
}

#[test]
fn add_memory_destination_is_rejected() {
    let vm = run_vm("ADD [0], 1");
    assert_eq!(vm.memory().load(0), Ok(0));
    assert_eq!(
        vm.log().lines(),
        ["Error: Invalid destination register [0] (line 1)"]
    );
}

#[test]
fn sub_unparsable_source_subtracts_zero() {
    let vm = run_vm("MOV edx, 9\nSUB edx, 1z");
    assert_eq!(vm.registers().get(Register::Edx), 9);
    assert_eq!(vm.log().count_kind(ErrorKind::Parse), 1);
}

// ==================== PUSH / POP ====================

#[test]
fn first_push_lands_at_top_of_memory() {
    let vm = run_vm("PUSH 99");
    assert_eq!(vm.registers().get(Register::Esp), -4);
    assert_eq!(vm.memory().cells()[1020], 99);
    assert_eq!(vm.log().lines(), ["PUSH: 99 to stack at ESP=-4"]);
}

#[test]
fn stack_is_last_in_first_out() {
    let vm = run_vm("PUSH 1\nPUSH 2\nPUSH eax\nPOP ecx\nPOP ebx\nPOP eax");
    assert_eq!(vm.registers().get(Register::Ecx), 0);
    assert_eq!(vm.registers().get(Register::Ebx), 2);
    assert_eq!(vm.registers().get(Register::Eax), 1);
    assert_eq!(vm.registers().get(Register::Esp), 0);
}

#[test]
fn push_with_explicit_stack_pointer() {
    let vm = run_vm("MOV esp, 100\nPUSH 5\nMOV eax, [96]");
    assert_eq!(vm.registers().get(Register::Esp), 96);
    assert_eq!(vm.registers().get(Register::Eax), 5);
}

#[test]
fn pop_reads_before_push_without_fault() {
    let vm = run_vm("POP eax");
    assert_eq!(vm.registers().get(Register::Eax), 0);
    assert_eq!(vm.registers().get(Register::Esp), 4);
    assert!(vm.log().faults().next().is_none());
}

#[test]
fn pop_into_esp_increments_popped_value() {
    let vm = run_vm("PUSH 40\nPOP esp");
    assert_eq!(vm.registers().get(Register::Esp), 44);
}

#[test]
fn stack_overflow_past_bottom_of_memory() {
    let vm = run_vm("MOV esp, -1024\nPUSH 1");
    assert_eq!(vm.registers().get(Register::Esp), -1024);
    assert_eq!(
        vm.log().faults().map(|(_, e)| e.clone()).collect::<Vec<_>>(),
        [VMError::StackOutOfBounds {
            sp: -1028,
            len: 1024
        }]
    );
}

#[test]
fn pop_with_out_of_range_stack_pointer() {
    let vm = run_vm("MOV esp, 5000\nMOV ebx, 1\nPOP ebx");
    assert_eq!(vm.registers().get(Register::Ebx), 1);
    assert_eq!(vm.registers().get(Register::Esp), 5000);
    assert_eq!(vm.log().count_kind(ErrorKind::Bounds), 1);
}

#[test]
fn pop_memory_destination_is_rejected() {
    assert_eq!(
        faults("POP [ebx]"),
        [(
            1,
            VMError::InvalidDestinationRegister {
                token: "[ebx]".into()
            }
        )]
    );
}

// ==================== Bounds ====================

#[test]
fn negative_memory_operand_is_bounds_error() {
    let vm = run_vm("MOV eax, 3\nMOV eax, [-4]");
    assert_eq!(vm.registers().get(Register::Eax), 0);
    assert_eq!(
        vm.log().lines()[1],
        "Error: Memory address -4 out of bounds (0..1024) (line 2)"
    );
}

#[test]
fn stack_pointer_is_not_a_general_address() {
    // [esp] after a push is -4, which ordinary addressing rejects
    let vm = run_vm("PUSH 7\nMOV eax, [esp]");
    assert_eq!(vm.registers().get(Register::Eax), 0);
    assert_eq!(vm.log().count_kind(ErrorKind::Bounds), 1);
}

#[test]
fn write_past_end_has_no_effect() {
    let vm = run_vm("MOV ebx, 1024\nMOV [ebx], 1\nMOV [1023], 2");
    assert_eq!(vm.memory().cells()[1023], 2);
    assert_eq!(
        faults("MOV ebx, 1024\nMOV [ebx], 1"),
        [(
            2,
            VMError::AddressOutOfBounds {
                address: 1024,
                len: 1024
            }
        )]
    );
}

// ==================== Decoding errors ====================

#[test]
fn every_error_kind_is_recovered() {
    let src = "\
        JMP 4\n\
        PUSH\n\
        ADD 1, 2\n\
        MOV eax, [q]\n\
        MOV eax, [4096]\n\
        MOV ecx, 1";
    let vm = run_vm(src);
    let log = vm.log();
    assert_eq!(log.count_kind(ErrorKind::UnknownOpcode), 1);
    assert_eq!(log.count_kind(ErrorKind::Arity), 1);
    assert_eq!(log.count_kind(ErrorKind::Target), 1);
    assert_eq!(log.count_kind(ErrorKind::Parse), 1);
    assert_eq!(log.count_kind(ErrorKind::Bounds), 1);
    assert_eq!(vm.registers().get(Register::Ecx), 1);
    assert_eq!(
        log.faults().map(|(line, _)| line).collect::<Vec<_>>(),
        [1, 2, 3, 4, 5]
    );
}

#[test]
fn uppercase_register_is_not_a_register() {
    assert_eq!(
        trace("MOV EAX, 1"),
        ["Error: Invalid destination EAX (line 1)"]
    );
}

#[test]
fn reset_clears_state_and_log() {
    let mut vm = run_vm("MOV eax, 1\nPUSH 2\nMOV [0], 3\nNOP");
    assert!(!vm.log().is_empty());
    vm.reset();
    assert_eq!(vm.registers(), &RegisterBank::new());
    assert!(vm.memory().cells().iter().all(|&c| c == 0));
    assert!(vm.log().is_empty());
}

#[test]
fn execute_attributes_line() {
    let mut vm = Machine::default();
    vm.execute(
        12,
        &Instr::Push {
            src: Operand::Immediate(1),
        },
    );
    assert_eq!(vm.log().entries()[0].line(), 12);
}

#[test]
fn rejected_destination_skips_source() {
    assert_eq!(
        trace("MOV 5, zz\nADD [0], zz"),
        [
            "Error: Invalid destination 5 (line 1)",
            "Error: Invalid destination register [0] (line 2)",
        ]
    );
}
