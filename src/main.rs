fn main() {
    metricgate::run();
}
